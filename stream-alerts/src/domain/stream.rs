//! Tracked stream entity.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use stream_platforms::{KeyKind, Platform};

use super::ids::ChannelId;

/// Normalized identity of a tracked stream within one platform.
///
/// The platform id is preferred; streams that were never resolved fall
/// back to their lowercased name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StreamKey {
    Id(String),
    Name(String),
}

impl StreamKey {
    pub fn from_parts(name: &str, id: Option<&str>) -> Self {
        match id {
            Some(id) => Self::Id(id.to_string()),
            None => Self::name(name),
        }
    }

    pub fn name(name: &str) -> Self {
        Self::Name(name.to_lowercase())
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Name(name) => write!(f, "name:{name}"),
        }
    }
}

/// A remote stream and the channels that want to hear about it.
///
/// Field aliases accept the upper-case keys written by older data files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedStream {
    #[serde(alias = "NAME")]
    pub name: String,
    #[serde(
        default,
        alias = "ID",
        deserialize_with = "optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, alias = "CHANNELS")]
    pub channels: BTreeSet<ChannelId>,
    /// Last status seen by the scheduler.
    #[serde(default, alias = "ALREADY_ONLINE")]
    pub online: bool,
}

/// Older data files stored ids as numbers.
fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|id| match id {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

impl TrackedStream {
    pub fn new(name: impl Into<String>, id: Option<String>) -> Self {
        Self {
            name: name.into(),
            id,
            channels: BTreeSet::new(),
            online: false,
        }
    }

    pub fn key(&self) -> StreamKey {
        StreamKey::from_parts(&self.name, self.id.as_deref())
    }

    /// The value the platform's status endpoint is addressed by, if known.
    pub fn check_key(&self, platform: Platform) -> Option<&str> {
        match platform.key_kind() {
            KeyKind::Id => self.id.as_deref(),
            KeyKind::Name => Some(self.name.as_str()),
        }
    }

    pub fn has_subscribers(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn is_subscribed(&self, channel: ChannelId) -> bool {
        self.channels.contains(&channel)
    }
}
