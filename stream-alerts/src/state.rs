//! The engine's mutable state and its write-back to the store.
//!
//! All subscription and settings changes go through one
//! [`parking_lot::Mutex`]. It is never held across an await: callers copy
//! what they need, release it, do their I/O, then lock again to apply.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use stream_platforms::Platform;
use tracing::{debug, info, warn};

use crate::Result;
use crate::domain::Settings;
use crate::store::{StateStore, SubscriptionStore, load_settings, save_settings};

/// Subscriptions and settings, plus what still needs writing.
#[derive(Debug, Default)]
pub struct AlertState {
    pub subscriptions: SubscriptionStore,
    pub settings: Settings,
    streams_unsaved: bool,
    settings_unsaved: bool,
}

impl AlertState {
    pub fn new(subscriptions: SubscriptionStore, settings: Settings) -> Self {
        Self {
            subscriptions,
            settings,
            streams_unsaved: false,
            settings_unsaved: false,
        }
    }

    pub fn mark_streams_unsaved(&mut self) {
        self.streams_unsaved = true;
    }

    pub fn mark_settings_unsaved(&mut self) {
        self.settings_unsaved = true;
    }

    pub fn has_unsaved(&self) -> bool {
        self.streams_unsaved || self.settings_unsaved
    }
}

/// Shared handle to the state and the store it is written to.
#[derive(Clone)]
pub struct StateHandle {
    state: Arc<Mutex<AlertState>>,
    store: Arc<dyn StateStore>,
    /// Orders writes so an older snapshot never lands after a newer one.
    save_gate: Arc<tokio::sync::Mutex<()>>,
}

impl StateHandle {
    pub fn new(state: AlertState, store: Arc<dyn StateStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            store,
            save_gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Load state from `store`. `seed_token` becomes the Twitch credential
    /// when none is stored yet.
    pub async fn load(store: Arc<dyn StateStore>, seed_token: Option<&str>) -> Self {
        let subscriptions = SubscriptionStore::load(store.as_ref()).await;
        let settings = load_settings(store.as_ref()).await;

        let mut state = AlertState::new(subscriptions, settings);
        if let Some(token) = seed_token.filter(|t| !t.is_empty())
            && state.settings.token(Platform::Twitch).is_none()
        {
            state.settings.tokens.set(Platform::Twitch, token);
            state.mark_settings_unsaved();
            info!("Seeded Twitch client id from the environment");
        }

        for platform in Platform::ALL {
            debug!(%platform, streams = state.subscriptions.len(platform), "Loaded tracked streams");
        }

        Self::new(state, store)
    }

    pub fn lock(&self) -> MutexGuard<'_, AlertState> {
        self.state.lock()
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Write everything marked unsaved. Returns whether anything was written.
    ///
    /// On failure the unsaved marks are restored so the next flush retries.
    pub async fn flush(&self) -> Result<bool> {
        let _gate = self.save_gate.lock().await;

        let (streams, settings) = {
            let mut state = self.state.lock();
            let streams = if state.streams_unsaved {
                Some(state.subscriptions.snapshot(&Platform::ALL)?)
            } else {
                None
            };
            let settings = state.settings_unsaved.then(|| state.settings.clone());
            state.streams_unsaved = false;
            state.settings_unsaved = false;
            (streams, settings)
        };

        if streams.is_none() && settings.is_none() {
            return Ok(false);
        }

        let mut result = Ok(true);

        if let Some(snapshot) = streams
            && let Err(e) = snapshot.save(self.store.as_ref()).await
        {
            self.state.lock().streams_unsaved = true;
            result = Err(e);
        }

        if let Some(settings) = settings
            && let Err(e) = save_settings(self.store.as_ref(), &settings).await
        {
            warn!(error = %e, "Failed to save settings");
            self.state.lock().settings_unsaved = true;
            if result.is_ok() {
                result = Err(e);
            }
        }

        result
    }
}
