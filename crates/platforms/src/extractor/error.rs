use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("api error: unexpected status {status}")]
    Api { status: u16 },
    #[error("invalid or missing credentials")]
    InvalidCredentials,
    #[error("streamer not found")]
    StreamerNotFound,
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("operation not supported by {0}")]
    Unsupported(&'static str),
    #[error("other: {0}")]
    Other(String),
}

impl ProviderError {
    /// The token was rejected or never configured.
    pub fn is_credentials(&self) -> bool {
        matches!(self, Self::InvalidCredentials)
    }

    /// Upstream failures that may clear up on their own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::Timeout(_) => true,
            Self::Api { status } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
