use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::models::MixerChannel;
use crate::extractor::error::ProviderError;
use crate::extractor::provider::{ApiBase, StreamProvider};
use crate::extractor::utils::{strip_channel_url, with_cache_buster};
use crate::media::{LiveInfo, StreamStatus};
use crate::platform::Platform;

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?mixer\.com/([^/?#]+)").expect("valid mixer url regex")
});

pub const DEFAULT_AVATAR: &str = "https://mixer.com/_latest/assets/images/main/avatars/default.jpg";

/// Mixer channel API client. Channels are addressed by name and the API
/// needs no credentials.
pub struct Mixer {
    api: ApiBase,
}

impl Mixer {
    pub const BASE_URL: &str = "https://mixer.com";
    const SITE_URL: &str = "https://mixer.com";

    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, Self::BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        let mut api = ApiBase::new(Platform::Mixer, base_url, client);
        api.add_header_typed(reqwest::header::ACCEPT, "application/json");
        Self { api }
    }

    fn live_info(channel: MixerChannel, key: &str) -> LiveInfo {
        let slug = channel.token.unwrap_or_else(|| key.to_string());
        let (display_name, avatar) = match channel.user {
            Some(user) => (user.username, user.avatar_url),
            None => (slug.clone(), None),
        };
        let avatar = avatar
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR.to_string());

        LiveInfo::builder(
            Platform::Mixer,
            display_name,
            format!("{}/{slug}", Self::SITE_URL),
        )
        .title_opt(channel.name)
        .avatar_url_opt(Some(avatar))
        .followers_opt(channel.num_followers)
        .total_views_opt(channel.viewers_total)
        .preview_url_opt(channel.thumbnail.map(|t| with_cache_buster(&t.url)))
        .game_opt(channel.game.map(|g| g.name))
        .build()
    }
}

#[async_trait]
impl StreamProvider for Mixer {
    fn platform(&self) -> Platform {
        Platform::Mixer
    }

    async fn check_status(
        &self,
        key: &str,
        _token: Option<&str>,
    ) -> Result<StreamStatus, ProviderError> {
        let response = self
            .api
            .get(&format!("/api/v1/channels/{key}"))
            .send()
            .await?;

        let status = response.status();
        debug!(key, status = status.as_u16(), "Mixer channel lookup");

        match status {
            StatusCode::OK => {
                let channel: MixerChannel = response.json().await?;
                if channel.online {
                    Ok(StreamStatus::Online(Box::new(Self::live_info(channel, key))))
                } else {
                    Ok(StreamStatus::Offline)
                }
            }
            StatusCode::NOT_FOUND => Ok(StreamStatus::NotFound),
            status => Err(ProviderError::Api {
                status: status.as_u16(),
            }),
        }
    }

    fn parse_channel_name(&self, input: &str) -> String {
        strip_channel_url(&URL_REGEX, input)
    }
}
