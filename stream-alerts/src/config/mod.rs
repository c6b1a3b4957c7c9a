//! Process configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding `twitch.json`, `mixer.json` and `settings.json`.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Wait between the end of one polling pass and the start of the next.
    pub check_interval: Duration,
    /// Upper bound on any single provider call.
    pub request_timeout: Duration,
    pub log_retention_days: i64,
    pub discord_token: String,
    /// Seeds the Twitch token when none is persisted yet.
    pub twitch_client_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/streams"),
            log_dir: PathBuf::from("logs"),
            check_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            log_retention_days: 7,
            discord_token: String::new(),
            twitch_client_id: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Supported env vars:
    /// - `STREAM_ALERTS_DATA_DIR`
    /// - `STREAM_ALERTS_LOG_DIR`
    /// - `STREAM_ALERTS_CHECK_INTERVAL_SECS`
    /// - `STREAM_ALERTS_REQUEST_TIMEOUT_SECS`
    /// - `STREAM_ALERTS_LOG_RETENTION_DAYS`
    /// - `DISCORD_BOT_TOKEN` (required)
    /// - `TWITCH_CLIENT_ID`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = var("STREAM_ALERTS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("STREAM_ALERTS_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(secs) = var("STREAM_ALERTS_CHECK_INTERVAL_SECS") {
            config.check_interval = parse_secs("STREAM_ALERTS_CHECK_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = var("STREAM_ALERTS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("STREAM_ALERTS_REQUEST_TIMEOUT_SECS", &secs)?;
        }
        if let Some(days) = var("STREAM_ALERTS_LOG_RETENTION_DAYS") {
            config.log_retention_days = days.trim().parse().map_err(|_| {
                Error::config(format!(
                    "STREAM_ALERTS_LOG_RETENTION_DAYS must be a whole number, got '{days}'"
                ))
            })?;
        }

        config.discord_token =
            var("DISCORD_BOT_TOKEN").ok_or_else(|| Error::config("DISCORD_BOT_TOKEN is not set"))?;
        config.twitch_client_id = var("TWITCH_CLIENT_ID");

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::config(format!(
            "{key} must be a positive number of seconds, got '{value}'"
        ))),
    }
}
