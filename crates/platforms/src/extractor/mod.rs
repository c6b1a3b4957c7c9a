pub mod error;
pub mod factory;
pub mod platforms;
pub mod provider;
pub mod utils;
mod default;

pub use default::{DEFAULT_REQUEST_TIMEOUT, create_client_builder, default_client, install_rustls_provider};
pub use factory::{ProviderRegistry, default_registry};
