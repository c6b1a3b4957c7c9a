use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::models::{StreamResponse, UsersResponse};
use crate::extractor::error::ProviderError;
use crate::extractor::provider::{ApiBase, RESOLVE_BATCH_SIZE, StreamProvider};
use crate::extractor::utils::{strip_channel_url, with_cache_buster};
use crate::media::{LiveInfo, ResolvedChannel, StreamStatus};
use crate::platform::Platform;

pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?twitch\.tv/([^/?#]+)").expect("valid twitch url regex")
});

/// Avatar shown for channels without a profile picture.
pub const DEFAULT_AVATAR: &str =
    "https://static-cdn.jtvnw.net/jtv_user_pictures/xarth/404_user_70x70.png";

/// Twitch API v5 ("kraken") client.
///
/// Channels are addressed by numeric user id; names are turned into ids
/// through [`StreamProvider::resolve_identifiers`]. Every request carries
/// the configured Client-ID.
pub struct Twitch {
    api: ApiBase,
}

impl Twitch {
    pub const BASE_URL: &str = "https://api.twitch.tv";
    const SITE_URL: &str = "https://www.twitch.tv";

    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, Self::BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        let mut api = ApiBase::new(Platform::Twitch, base_url, client);
        api.add_header_typed(reqwest::header::ACCEPT, "application/vnd.twitchtv.v5+json");
        Self { api }
    }

    fn require_token(token: Option<&str>) -> Result<&str, ProviderError> {
        match token {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(ProviderError::InvalidCredentials),
        }
    }

    fn live_info(&self, response: StreamResponse, key: &str) -> StreamStatus {
        let Some(stream) = response.stream else {
            return StreamStatus::Offline;
        };
        let channel = stream.channel;

        let display_name = channel
            .display_name
            .or_else(|| channel.name.clone())
            .unwrap_or_else(|| key.to_string());
        let url = channel.url.unwrap_or_else(|| {
            format!(
                "{}/{}",
                Self::SITE_URL,
                channel.name.as_deref().unwrap_or(key)
            )
        });
        let avatar = channel.logo.or_else(|| Some(DEFAULT_AVATAR.to_string()));
        let preview = stream
            .preview
            .and_then(|p| p.medium)
            .filter(|m| !m.is_empty())
            .map(|m| with_cache_buster(&m));

        let info = LiveInfo::builder(Platform::Twitch, display_name, url)
            .title_opt(channel.status)
            .avatar_url_opt(avatar)
            .followers_opt(channel.followers)
            .total_views_opt(channel.views)
            .preview_url_opt(preview)
            .game_opt(channel.game)
            .build();

        StreamStatus::Online(Box::new(info))
    }

    async fn fetch_users(
        &self,
        names: &[String],
        token: &str,
    ) -> Result<Vec<ResolvedChannel>, ProviderError> {
        let logins = names.join(",");
        debug!(count = names.len(), "Resolving twitch logins");

        let response = self
            .api
            .get("/kraken/users")
            .header("Client-ID", token)
            .query(&[("login", logins.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: UsersResponse = response.json().await?;
                Ok(body
                    .users
                    .into_iter()
                    .map(|u| ResolvedChannel {
                        name: u.name,
                        id: u.id,
                    })
                    .collect())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProviderError::InvalidCredentials)
            }
            status => Err(ProviderError::Api {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl StreamProvider for Twitch {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn check_status(
        &self,
        key: &str,
        token: Option<&str>,
    ) -> Result<StreamStatus, ProviderError> {
        let token = Self::require_token(token)?;

        let response = self
            .api
            .get(&format!("/kraken/streams/{key}"))
            .header("Client-ID", token)
            .send()
            .await?;

        let status = response.status();
        debug!(key, status = status.as_u16(), "Twitch stream lookup");

        match status {
            StatusCode::OK => {
                let body: StreamResponse = response.json().await?;
                Ok(self.live_info(body, key))
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ProviderError::InvalidCredentials)
            }
            StatusCode::NOT_FOUND => Ok(StreamStatus::NotFound),
            status => Err(ProviderError::Api {
                status: status.as_u16(),
            }),
        }
    }

    async fn resolve_identifiers(
        &self,
        names: &[String],
        token: Option<&str>,
        require_match: bool,
    ) -> Result<Vec<ResolvedChannel>, ProviderError> {
        let mut results = Vec::new();

        if !names.is_empty() {
            let token = Self::require_token(token)?;
            for chunk in names.chunks(RESOLVE_BATCH_SIZE) {
                results.extend(self.fetch_users(chunk, token).await?);
            }
        }

        if results.is_empty() && require_match {
            return Err(ProviderError::StreamerNotFound);
        }

        Ok(results)
    }

    fn parse_channel_name(&self, input: &str) -> String {
        strip_channel_url(&URL_REGEX, input)
    }
}
