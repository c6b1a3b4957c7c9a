//! Stream alerts: watches streaming channels and notifies subscribed chat
//! channels when they go live.
//!
//! [`AlertService`] is the command-facing API for managing alerts and guild
//! settings. [`PollingScheduler`] runs the background checks and hands state
//! changes to the [`NotificationManager`].

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod service;
pub mod state;
pub mod store;
pub mod utils;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use monitor::{CycleReport, MigrationTask, PollingScheduler, SchedulerConfig};
pub use notification::{
    DefaultRenderer, DiscordTransport, MessageTransport, NotificationEvent,
    NotificationEventBroadcaster, NotificationManager, NotificationRenderer,
};
pub use service::{AlertError, AlertService};
pub use state::{AlertState, StateHandle};
pub use store::{JsonFileStore, MemoryStore, StateStore, SubscriptionStore, Toggle};
