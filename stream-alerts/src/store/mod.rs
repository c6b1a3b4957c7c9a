//! Subscription state and its persistence.

pub mod persistence;
pub mod subscriptions;

pub use persistence::{JsonFileStore, MemoryStore, SETTINGS_KEY, StateStore, load_settings, save_settings};
pub use subscriptions::{StoreSnapshot, SubscriptionStore, Toggle};
