//! The per-stream online/offline state machine.

use stream_platforms::StreamStatus;

/// Edge produced by one status observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
    Unchanged,
}

/// Compare the last recorded state with a fresh observation.
///
/// Only a change of state is an edge; repeated observations of the same
/// state are [`Transition::Unchanged`]. Not-found counts as offline.
pub fn transition(was_online: bool, status: &StreamStatus) -> Transition {
    match (was_online, status.is_online()) {
        (false, true) => Transition::WentOnline,
        (true, false) => Transition::WentOffline,
        _ => Transition::Unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_platforms::{LiveInfo, Platform};

    fn online() -> StreamStatus {
        StreamStatus::Online(Box::new(
            LiveInfo::builder(Platform::Mixer, "foo", "https://mixer.com/foo").build(),
        ))
    }

    #[test]
    fn test_edges() {
        assert_eq!(transition(false, &online()), Transition::WentOnline);
        assert_eq!(transition(true, &online()), Transition::Unchanged);
        assert_eq!(transition(true, &StreamStatus::Offline), Transition::WentOffline);
        assert_eq!(transition(true, &StreamStatus::NotFound), Transition::WentOffline);
        assert_eq!(transition(false, &StreamStatus::Offline), Transition::Unchanged);
        assert_eq!(transition(false, &StreamStatus::NotFound), Transition::Unchanged);
    }
}
