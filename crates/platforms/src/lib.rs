//! Status-check clients for the streaming platforms watched by stream-alerts.
//!
//! Each platform implements [`StreamProvider`]: a uniform "is this channel
//! live" check plus, for platforms addressed by id, batched name-to-id
//! resolution.

pub mod extractor;
pub mod media;
pub mod platform;

pub use extractor::error::ProviderError;
pub use extractor::provider::{RESOLVE_BATCH_SIZE, StreamProvider};
pub use extractor::{ProviderRegistry, default_registry};
pub use media::{LiveInfo, ResolvedChannel, StreamStatus};
pub use platform::{KeyKind, Platform};
