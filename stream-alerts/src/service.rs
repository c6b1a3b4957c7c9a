//! Subscription and settings API for command handlers.

use std::time::Duration;

use stream_platforms::{KeyKind, LiveInfo, Platform, ProviderError, ProviderRegistry, StreamStatus};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{ChannelId, GuildId, GuildSettings, MentionMode, Settings};
use crate::monitor::with_timeout;
use crate::state::StateHandle;
use crate::store::Toggle;

/// Failures reported back to whoever issued a command.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("stream '{0}' does not exist")]
    NotFound(String),

    #[error("{0} is offline")]
    Offline(String),

    #[error("{0} client id is invalid or not set")]
    InvalidCredentials(Platform),

    #[error("provider request failed: {0}")]
    Api(#[source] ProviderError),
}

impl AlertError {
    fn from_provider(error: ProviderError, name: &str, platform: Platform) -> Self {
        match error {
            ProviderError::StreamerNotFound => Self::NotFound(name.to_string()),
            ProviderError::InvalidCredentials => Self::InvalidCredentials(platform),
            other => Self::Api(other),
        }
    }

    /// Text to show the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) => "That stream doesn't exist.".to_string(),
            Self::Offline(name) => format!("{name} is offline."),
            Self::InvalidCredentials(_) => "Client-ID is invalid or not set.".to_string(),
            Self::Api(_) => "Error contacting the API.".to_string(),
        }
    }
}

/// Entry point for adding, removing and listing alerts and for guild settings.
#[derive(Clone)]
pub struct AlertService {
    state: StateHandle,
    providers: ProviderRegistry,
    request_timeout: Duration,
}

impl AlertService {
    pub fn new(state: StateHandle, providers: ProviderRegistry, request_timeout: Duration) -> Self {
        Self {
            state,
            providers,
            request_timeout,
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    fn token(&self, platform: Platform) -> Option<String> {
        self.state
            .lock()
            .settings
            .token(platform)
            .map(str::to_string)
    }

    /// Turn `channel`'s alert for a stream on or off.
    ///
    /// `stream` may be a bare name or a channel URL. The stream is looked up
    /// on the platform first so alerts are only created for streams that
    /// exist; id-keyed platforms also get the stream's id recorded.
    pub async fn subscribe(
        &self,
        platform: Platform,
        stream: &str,
        channel: ChannelId,
    ) -> Result<Toggle, AlertError> {
        let provider = self.providers.get(platform).map_err(AlertError::Api)?;
        let name = provider.parse_channel_name(stream);
        if name.is_empty() {
            return Err(AlertError::NotFound(name));
        }
        let token = self.token(platform);

        let resolved_id = match platform.key_kind() {
            KeyKind::Id => Some(self.resolve_id(platform, &name, token.as_deref()).await?),
            KeyKind::Name => {
                match with_timeout(self.request_timeout, provider.check_status(&name, token.as_deref()))
                    .await
                {
                    Ok(StreamStatus::NotFound) => return Err(AlertError::NotFound(name)),
                    Ok(_) => None,
                    Err(e) => return Err(AlertError::from_provider(e, &name, platform)),
                }
            }
        };

        let toggle = {
            let mut state = self.state.lock();
            let toggle = state
                .subscriptions
                .toggle(platform, &name, channel, resolved_id.as_deref());
            state.mark_streams_unsaved();
            toggle
        };

        info!(%platform, stream = %name, %channel, ?toggle, "Alert toggled");
        self.persist().await;
        Ok(toggle)
    }

    /// Resolve a single name on an id-keyed platform.
    async fn resolve_id(
        &self,
        platform: Platform,
        name: &str,
        token: Option<&str>,
    ) -> Result<String, AlertError> {
        let provider = self.providers.get(platform).map_err(AlertError::Api)?;
        let names = [name.to_string()];
        let resolved = with_timeout(
            self.request_timeout,
            provider.resolve_identifiers(&names, token, true),
        )
        .await
        .map_err(|e| AlertError::from_provider(e, name, platform))?;

        resolved
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .or_else(|| resolved.first())
            .map(|c| c.id.clone())
            .ok_or_else(|| AlertError::NotFound(name.to_string()))
    }

    /// Remove every alert from `channel`. Returns how many were removed.
    pub async fn unsubscribe_all_in_channel(&self, channel: ChannelId) -> usize {
        let removed = {
            let mut state = self.state.lock();
            let removed = state.subscriptions.unsubscribe_all(channel);
            if removed > 0 {
                state.mark_streams_unsaved();
            }
            removed
        };

        if removed > 0 {
            info!(%channel, removed, "Removed all alerts from channel");
            self.persist().await;
        }
        removed
    }

    /// `(platform, stream name)` of every alert in `channel`.
    pub fn subscriptions_for(&self, channel: ChannelId) -> Vec<(Platform, String)> {
        self.state.lock().subscriptions.subscriptions_for(channel)
    }

    /// Check right now whether a stream is live.
    pub async fn check_now(&self, platform: Platform, stream: &str) -> Result<LiveInfo, AlertError> {
        let provider = self.providers.get(platform).map_err(AlertError::Api)?;
        let name = provider.parse_channel_name(stream);
        if name.is_empty() {
            return Err(AlertError::NotFound(name));
        }
        let token = self.token(platform);

        let key = match platform.key_kind() {
            KeyKind::Id => self.resolve_id(platform, &name, token.as_deref()).await?,
            KeyKind::Name => name.clone(),
        };

        let status = with_timeout(self.request_timeout, provider.check_status(&key, token.as_deref()))
            .await
            .map_err(|e| AlertError::from_provider(e, &name, platform))?;

        match status {
            StreamStatus::Online(info) => Ok(*info),
            StreamStatus::Offline => Err(AlertError::Offline(name)),
            StreamStatus::NotFound => Err(AlertError::NotFound(name)),
        }
    }

    pub fn settings(&self) -> Settings {
        self.state.lock().settings.clone()
    }

    pub fn guild_settings(&self, guild: GuildId) -> GuildSettings {
        self.state.lock().settings.guild(guild)
    }

    pub async fn set_guild_mention(&self, guild: GuildId, mention: MentionMode) {
        self.update_settings(|settings| settings.guild_mut(guild).mention = mention)
            .await;
        info!(%guild, %mention, "Mention type updated");
    }

    pub async fn set_guild_auto_delete(&self, guild: GuildId, enabled: bool) {
        self.update_settings(|settings| settings.guild_mut(guild).auto_delete = enabled)
            .await;
        info!(%guild, enabled, "Notification auto-delete updated");
    }

    /// Flip auto-delete for a guild. Returns the new value.
    pub async fn toggle_guild_auto_delete(&self, guild: GuildId) -> bool {
        let enabled = self
            .update_settings(|settings| {
                let guild = settings.guild_mut(guild);
                guild.auto_delete = !guild.auto_delete;
                guild.auto_delete
            })
            .await;
        info!(%guild, enabled, "Notification auto-delete toggled");
        enabled
    }

    pub async fn set_credential(&self, platform: Platform, token: &str) {
        let token = token.trim().to_string();
        self.update_settings(|settings| settings.tokens.set(platform, token))
            .await;
        info!(%platform, "Client token updated");
    }

    async fn update_settings<T>(&self, update: impl FnOnce(&mut Settings) -> T) -> T {
        let result = {
            let mut state = self.state.lock();
            let result = update(&mut state.settings);
            state.mark_settings_unsaved();
            result
        };
        self.persist().await;
        result
    }

    /// Write pending changes. A failure stays marked and is retried by the
    /// next polling cycle.
    async fn persist(&self) {
        match self.state.flush().await {
            Ok(written) => debug!(written, "State saved"),
            Err(e) => warn!(error = %e, "Failed to save state; will retry"),
        }
    }
}
