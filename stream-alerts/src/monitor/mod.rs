//! Background polling: identifier migration and edge-triggered status checks.

pub mod migration;
pub mod scheduler;
pub mod transition;

pub use migration::{MigrationReport, MigrationTask};
pub use scheduler::{CycleReport, PollingScheduler, SchedulerConfig};
pub use transition::{Transition, transition};

use std::future::Future;
use std::time::Duration;

use stream_platforms::ProviderError;

/// Bound a provider call by `limit`, reporting an overrun as
/// [`ProviderError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ProviderError::Timeout(limit))?
}
