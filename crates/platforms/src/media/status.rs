use serde::{Deserialize, Serialize};

use super::live_info::LiveInfo;

/// Outcome of a single status check.
///
/// `Offline` and `NotFound` are ordinary answers from the platform, not
/// failures; failures travel as [`ProviderError`](crate::ProviderError).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamStatus {
    /// The channel is broadcasting.
    Online(Box<LiveInfo>),
    /// The channel exists but is not broadcasting.
    Offline,
    /// The platform does not know this channel.
    NotFound,
}

impl StreamStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online(_))
    }

    /// Offline and not-found both count as "not live" for transitions.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline | Self::NotFound)
    }

    pub fn live_info(&self) -> Option<&LiveInfo> {
        match self {
            Self::Online(info) => Some(info),
            _ => None,
        }
    }
}

/// A channel name resolved to the platform's stable identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChannel {
    /// Login name as reported by the platform.
    pub name: String,
    pub id: String,
}
