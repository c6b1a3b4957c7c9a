//! Discord REST transport.
//!
//! Rate limits are handled the way Discord recommends: no hardcoded
//! limits; a 429 response is retried after the delay given in its
//! `Retry-After` (or `X-RateLimit-Reset-After`) header. Delays longer than
//! the configured maximum fail the request instead of blocking the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::transport::{ChannelInfo, MessageTransport, RenderedNotification};
use crate::domain::{ChannelId, GuildId, MessageId};
use crate::{Error, Result};

/// Discord API root.
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Maximum number of retries for rate-limited requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Wait used when a 429 carries no usable delay header.
const DEFAULT_RETRY_WAIT: Duration = Duration::from_secs(1);

/// Longest rate-limit delay honoured unless configured otherwise.
pub const DEFAULT_MAX_RETRY_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ChannelResponse {
    #[serde(default)]
    guild_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    id: String,
}

/// Posts and deletes messages through the Discord bot API.
pub struct DiscordTransport {
    client: Client,
    base_url: String,
    token: String,
    max_retry_wait: Duration,
}

impl DiscordTransport {
    pub fn new(client: Client, token: impl Into<String>) -> Self {
        Self::with_base_url(client, token, DISCORD_API_BASE)
    }

    pub fn with_base_url(client: Client, token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            max_retry_wait: DEFAULT_MAX_RETRY_WAIT,
        }
    }

    /// Give up on a rate-limited request when Discord asks to wait longer
    /// than `wait`.
    pub fn with_max_retry_wait(mut self, wait: Duration) -> Self {
        self.max_retry_wait = wait;
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.token))
    }

    /// Send a request, retrying 429 responses up to [`MAX_RATE_LIMIT_RETRIES`].
    async fn send_with_retry<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let response = self
                .authorize(build())
                .send()
                .await
                .map_err(|e| Error::transport(format!("Discord request failed: {e}")))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let retry_after = parse_retry_after(&response);
            if attempts >= MAX_RATE_LIMIT_RETRIES {
                warn!(
                    retries = MAX_RATE_LIMIT_RETRIES,
                    ?retry_after,
                    "Discord rate limit: max retries exceeded"
                );
                return Err(Error::transport(format!(
                    "Discord rate limit exceeded after {MAX_RATE_LIMIT_RETRIES} retries"
                )));
            }

            let wait = retry_after.unwrap_or(DEFAULT_RETRY_WAIT);
            if wait > self.max_retry_wait {
                warn!(
                    ?wait,
                    max_wait = ?self.max_retry_wait,
                    "Discord rate limit: requested wait too long, giving up"
                );
                return Err(Error::transport(format!(
                    "Discord rate limit: retry after {wait:?} exceeds {:?}",
                    self.max_retry_wait
                )));
            }

            debug!(
                ?wait,
                attempt = attempts,
                max = MAX_RATE_LIMIT_RETRIES,
                "Discord rate limited (429), waiting before retry"
            );
            tokio::time::sleep(wait).await;
        }
    }

    async fn error_for(response: Response, what: &str) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Error::transport(format!("Discord {what} failed: {status} - {body}"))
    }
}

/// Parse the retry delay from a 429 response. Delays too large for a
/// [`Duration`] saturate to [`Duration::MAX`].
fn parse_retry_after(response: &Response) -> Option<Duration> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .iter()
        .filter_map(|name| response.headers().get(*name))
        .filter_map(|value| value.to_str().ok()?.parse::<f64>().ok())
        .find(|secs| !secs.is_nan() && *secs >= 0.0)
        .map(|secs| Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
}

#[async_trait]
impl MessageTransport for DiscordTransport {
    async fn channel_info(&self, channel: ChannelId) -> Result<Option<ChannelInfo>> {
        let url = format!("{}/channels/{channel}", self.base_url);
        let response = self.send_with_retry(|| self.client.get(&url)).await?;

        match response.status() {
            status if status.is_success() => {
                let body: ChannelResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::transport(format!("Discord channel response invalid: {e}")))?;
                // Direct messages have no guild and are never alert targets.
                // Permissions are not computed here: `can_send` is always
                // set and a channel the bot may not post in surfaces as a
                // failed send.
                Ok(body
                    .guild_id
                    .and_then(|id| id.parse::<u64>().ok())
                    .map(|guild| ChannelInfo {
                        guild: GuildId(guild),
                        can_send: true,
                    }))
            }
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(Self::error_for(response, "channel lookup").await),
        }
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &RenderedNotification,
    ) -> Result<MessageId> {
        let url = format!("{}/channels/{channel}/messages", self.base_url);
        let mut payload = json!({
            "content": message.content,
            "allowed_mentions": { "parse": ["everyone"] },
        });
        if let Some(embed) = &message.embed {
            payload["embeds"] = json!([embed]);
        }

        let response = self
            .send_with_retry(|| self.client.post(&url).json(&payload))
            .await?;
        if !response.status().is_success() {
            return Err(Self::error_for(response, "message send").await);
        }

        let body: MessageResponse = response
            .json()
            .await
            .map_err(|e| Error::transport(format!("Discord message response invalid: {e}")))?;
        body.id
            .parse::<u64>()
            .map(MessageId)
            .map_err(|_| Error::transport(format!("Discord returned invalid message id '{}'", body.id)))
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        let url = format!("{}/channels/{channel}/messages/{message}", self.base_url);
        let response = self.send_with_retry(|| self.client.delete(&url)).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response, "message delete").await)
        }
    }
}
