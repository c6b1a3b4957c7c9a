use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;

use super::error::ProviderError;
use super::platforms::{mixer::Mixer, twitch::Twitch};
use super::provider::StreamProvider;
use crate::platform::Platform;

/// Maps each platform to the client that checks it.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Platform, Arc<dyn StreamProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for its platform.
    pub fn register(&mut self, provider: Arc<dyn StreamProvider>) -> &mut Self {
        self.providers.insert(provider.platform(), provider);
        self
    }

    pub fn get(&self, platform: Platform) -> Result<Arc<dyn StreamProvider>, ProviderError> {
        self.providers
            .get(&platform)
            .cloned()
            .ok_or_else(|| ProviderError::UnsupportedPlatform(platform.to_string()))
    }

    /// Registered platforms in [`Platform::ALL`] order.
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }
}

/// Returns a registry populated with all supported platforms.
pub fn default_registry(client: Client) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry
        .register(Arc::new(Twitch::new(client.clone())))
        .register(Arc::new(Mixer::new(client)));
    registry
}
