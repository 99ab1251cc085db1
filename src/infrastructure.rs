//! Infrastructure layer - external concerns
//!
//! Configuration, logging and the HTTP clients for the two remote services.

pub mod config;
pub mod crux_client;
pub mod http_client;
pub mod logging;
pub mod storage_client;

pub use config::{AppConfig, ConfigError, ConfigLoader, LoggingConfig};
pub use crux_client::CruxApiClient;
pub use http_client::{ClientError, HttpClient, HttpClientConfig};
pub use logging::{init_logging_with_config, log_system_info};
pub use storage_client::StorageServiceClient;
