use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::extractor::error::ProviderError;

/// How a platform addresses the channels it hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Status checks are addressed by a stable numeric/opaque id.
    Id,
    /// Status checks are addressed by the channel name.
    Name,
}

/// Supported streaming platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Mixer,
}

impl Platform {
    /// All platforms, in the order the scheduler walks them.
    pub const ALL: [Platform; 2] = [Platform::Twitch, Platform::Mixer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Mixer => "mixer",
        }
    }

    /// Human-facing platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::Mixer => "Mixer",
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        match self {
            Self::Twitch => KeyKind::Id,
            Self::Mixer => KeyKind::Name,
        }
    }

    /// Whether the platform API rejects requests without a client token.
    pub fn requires_token(&self) -> bool {
        matches!(self, Self::Twitch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitch" => Ok(Self::Twitch),
            // Mixer was called Beam before the rebrand; old data files still use it.
            "mixer" | "beam" => Ok(Self::Mixer),
            other => Err(ProviderError::UnsupportedPlatform(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_str() {
        assert_eq!("Twitch".parse::<Platform>().unwrap(), Platform::Twitch);
        assert_eq!("beam".parse::<Platform>().unwrap(), Platform::Mixer);
        assert!(matches!(
            "youtube".parse::<Platform>(),
            Err(ProviderError::UnsupportedPlatform(_))
        ));
    }

    #[test]
    fn test_key_kind() {
        assert_eq!(Platform::Twitch.key_kind(), KeyKind::Id);
        assert_eq!(Platform::Mixer.key_kind(), KeyKind::Name);
        assert!(Platform::Twitch.requires_token());
        assert!(!Platform::Mixer.requires_token());
    }

    #[test]
    fn test_platform_serde() {
        let json = serde_json::to_string(&Platform::Mixer).unwrap();
        assert_eq!(json, "\"mixer\"");
    }
}
