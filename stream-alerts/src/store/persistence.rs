//! Key-value persistence of engine state.
//!
//! State is stored as JSON documents under three keys: one list of tracked
//! streams per platform (`twitch`, `mixer`) and the `settings` record.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::Settings;
use crate::utils::fs;
use crate::{Error, Result};

/// Persistence key of the settings record.
pub const SETTINGS_KEY: &str = "settings";

/// Load/save capability injected into the engine.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the document stored under `key`; `None` when nothing is stored.
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    async fn save(&self, key: &str, value: &Value) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let Some(contents) = fs::read_optional(&path).await? else {
            debug!(path = %path.display(), "No state file yet");
            return Ok(None);
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.path_for(key);
        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write_atomic(&path, &bytes).await
    }
}

/// In-process store, used by tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document under `key`.
    pub fn insert(&self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Make every subsequent save fail until switched back off.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Other(format!("save of '{key}' rejected")));
        }
        self.insert(key, value.clone());
        Ok(())
    }
}

/// Load the settings record, falling back to defaults when it is missing
/// or unreadable.
pub async fn load_settings(store: &dyn StateStore) -> Settings {
    match store.load(SETTINGS_KEY).await {
        Ok(Some(value)) => match Settings::from_stored(value) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "Settings record is invalid; using defaults");
                Settings::default()
            }
        },
        Ok(None) => Settings::default(),
        Err(e) => {
            warn!(error = %e, "Failed to load settings; using defaults");
            Settings::default()
        }
    }
}

pub async fn save_settings(store: &dyn StateStore, settings: &Settings) -> Result<()> {
    let value = serde_json::to_value(settings)?;
    store.save(SETTINGS_KEY, &value).await
}
