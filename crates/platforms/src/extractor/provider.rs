use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::error::ProviderError;
use crate::media::{ResolvedChannel, StreamStatus};
use crate::platform::Platform;

/// Largest number of names a platform accepts in one lookup request.
pub const RESOLVE_BATCH_SIZE: usize = 100;

/// Shared HTTP plumbing for platform API clients.
///
/// Holds the platform's API base URL and the headers sent with every
/// request. The base URL is swappable so tests can point a client at a
/// local mock server.
#[derive(Debug, Clone)]
pub struct ApiBase {
    pub platform: Platform,
    pub base_url: String,
    pub client: Client,
    headers: HeaderMap,
}

impl ApiBase {
    pub fn new(platform: Platform, base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            platform,
            base_url,
            client,
            headers: HeaderMap::new(),
        }
    }

    pub fn add_header_typed<K: Into<HeaderName>, V: AsRef<str>>(&mut self, key: K, value: V) {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.headers.insert(key.into(), value);
            }
            Err(e) => {
                debug!(error = %e, "Invalid header value; skipping");
            }
        }
    }

    /// Full URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET request carrying the platform headers.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).headers(self.headers.clone())
    }
}

/// Uniform status-check contract every platform client implements.
#[async_trait]
pub trait StreamProvider: Send + Sync {
    fn platform(&self) -> Platform;

    /// Check whether the channel addressed by `key` is live.
    ///
    /// `key` is an id or a name depending on [`Platform::key_kind`].
    /// `token` is the client credential for platforms that need one.
    async fn check_status(
        &self,
        key: &str,
        token: Option<&str>,
    ) -> Result<StreamStatus, ProviderError>;

    /// Resolve channel names to stable ids.
    ///
    /// Names are sent in batches of at most [`RESOLVE_BATCH_SIZE`] and the
    /// results are concatenated in batch order. An empty input returns an
    /// empty result without touching the network. With `require_match`
    /// set, an empty result is reported as
    /// [`ProviderError::StreamerNotFound`].
    async fn resolve_identifiers(
        &self,
        names: &[String],
        token: Option<&str>,
        require_match: bool,
    ) -> Result<Vec<ResolvedChannel>, ProviderError> {
        let _ = (names, token, require_match);
        Err(ProviderError::Unsupported(self.platform().display_name()))
    }

    /// Normalize user input (a bare name or a channel page URL) into a
    /// channel name.
    fn parse_channel_name(&self, input: &str) -> String {
        input.trim().to_string()
    }
}
