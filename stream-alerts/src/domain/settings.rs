//! Persisted settings: platform credentials and per-guild notification options.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use stream_platforms::Platform;
use tracing::warn;

use super::ids::GuildId;
use crate::Error;

/// Who gets pinged when a stream goes live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionMode {
    #[default]
    None,
    Everyone,
    Here,
}

impl MentionMode {
    /// Text placed before the notification message.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Everyone => "@everyone",
            Self::Here => "@here",
        }
    }
}

impl fmt::Display for MentionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Everyone => "everyone",
            Self::Here => "here",
        })
    }
}

impl FromStr for MentionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('@').to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "everyone" => Ok(Self::Everyone),
            "here" => Ok(Self::Here),
            other => Err(Error::Other(format!(
                "unknown mention type '{other}' (expected everyone, here or none)"
            ))),
        }
    }
}

fn default_auto_delete() -> bool {
    true
}

/// Notification options for one guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    #[serde(default)]
    pub mention: MentionMode,
    /// Delete live notifications once the stream goes offline.
    #[serde(default = "default_auto_delete")]
    pub auto_delete: bool,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            mention: MentionMode::None,
            auto_delete: true,
        }
    }
}

/// Client tokens for platforms whose API requires one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    tokens: BTreeMap<Platform, String>,
}

impl Credentials {
    pub fn get(&self, platform: Platform) -> Option<&str> {
        self.tokens
            .get(&platform)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    pub fn set(&mut self, platform: Platform, token: impl Into<String>) {
        self.tokens.insert(platform, token.into());
    }

    pub fn contains(&self, platform: Platform) -> bool {
        self.get(platform).is_some()
    }
}

/// Per-guild entry of older data files, stored at the top level under the
/// guild id.
#[derive(Debug, Deserialize)]
struct LegacyGuildSettings {
    #[serde(default, rename = "MENTION")]
    mention: Option<String>,
    #[serde(default, rename = "AUTODELETE")]
    auto_delete: Option<bool>,
}

impl LegacyGuildSettings {
    fn into_current(self, guild: GuildId) -> GuildSettings {
        let mut settings = GuildSettings::default();
        if let Some(mention) = self.mention {
            match mention.parse() {
                Ok(mode) => settings.mention = mode,
                Err(e) => warn!(%guild, error = %e, "Ignoring legacy mention type"),
            }
        }
        if let Some(auto_delete) = self.auto_delete {
            settings.auto_delete = auto_delete;
        }
        settings
    }
}

/// The persisted settings record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub tokens: Credentials,
    #[serde(default)]
    pub guilds: BTreeMap<GuildId, GuildSettings>,
    /// Token field written by older data files; folded into `tokens`.
    #[serde(default, rename = "TWITCH_TOKEN", skip_serializing)]
    legacy_twitch_token: Option<String>,
}

impl Settings {
    /// Parse a stored settings record.
    ///
    /// Older files keep guild options at the top level keyed by guild id;
    /// those entries are moved into `guilds` unless the guild already has
    /// current settings.
    pub fn from_stored(value: Value) -> serde_json::Result<Self> {
        let (value, legacy) = match value {
            Value::Object(mut map) => {
                let legacy_keys: Vec<String> = map
                    .keys()
                    .filter(|key| key.parse::<u64>().is_ok())
                    .cloned()
                    .collect();
                let legacy: Vec<(String, Value)> = legacy_keys
                    .into_iter()
                    .filter_map(|key| map.remove(&key).map(|entry| (key, entry)))
                    .collect();
                (Value::Object(map), legacy)
            }
            other => (other, Vec::new()),
        };

        let mut settings: Self = serde_json::from_value(value)?;
        for (key, entry) in legacy {
            let Ok(id) = key.parse::<u64>() else {
                continue;
            };
            let guild = GuildId(id);
            match serde_json::from_value::<LegacyGuildSettings>(entry) {
                Ok(legacy) => {
                    settings
                        .guilds
                        .entry(guild)
                        .or_insert_with(|| legacy.into_current(guild));
                }
                Err(e) => warn!(%guild, error = %e, "Ignoring unreadable legacy guild settings"),
            }
        }
        Ok(settings.normalize())
    }

    /// Fold legacy fields into their current home.
    pub fn normalize(mut self) -> Self {
        if let Some(token) = self.legacy_twitch_token.take()
            && !self.tokens.contains(Platform::Twitch)
        {
            self.tokens.set(Platform::Twitch, token);
        }
        self
    }

    /// Settings for a guild, falling back to the defaults.
    pub fn guild(&self, guild: GuildId) -> GuildSettings {
        self.guilds.get(&guild).copied().unwrap_or_default()
    }

    pub fn guild_mut(&mut self, guild: GuildId) -> &mut GuildSettings {
        self.guilds.entry(guild).or_default()
    }

    pub fn token(&self, platform: Platform) -> Option<&str> {
        self.tokens.get(platform)
    }
}
