//! Configuration infrastructure
//!
//! Configuration is layered with the `config` crate:
//! 1. Built-in defaults (see [`defaults`])
//! 2. Optional `crux-collector.{toml,json,yaml}` file
//! 3. `CRUX_COLLECTOR__*` environment variables
//!
//! The upstream API key falls back to `CRUX_API_KEY` when not configured.
//! The validated [`AppConfig`] is built once at startup and handed to the
//! collector explicitly.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::DeviceClass;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Credential for the upstream API
///
/// Never rendered in logs: both `Debug` and `Display` print `***`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub collector: CollectorConfig,
    pub upstream: UpstreamConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// Pipeline behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Device classes queried for every page, in merge order
    pub devices: Vec<DeviceClass>,

    /// Upper bound on page pipelines in flight at once
    pub max_concurrent_pages: usize,

    /// Post records that have per-metric gaps (a device missing a metric)
    pub store_partial_records: bool,
}

/// Upstream field data API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,

    /// Falls back to the `CRUX_API_KEY` environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<ApiKey>,

    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub user_agent: String,
}

/// Local storage service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Trigger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run on the cron schedule; when false the binary runs once and exits
    pub enabled: bool,

    /// Seconds-resolution cron expression, evaluated in UTC
    pub cron: String,

    /// Trigger one run immediately when the scheduler starts
    pub run_on_startup: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Prefix of the daily rotated log file
    pub file_name: String,

    /// Log directory; defaults to `logs/` next to the executable
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            devices: defaults::DEVICES.to_vec(),
            max_concurrent_pages: defaults::MAX_CONCURRENT_PAGES,
            store_partial_records: defaults::STORE_PARTIAL_RECORDS,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::UPSTREAM_BASE_URL.to_string(),
            api_key: None,
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::STORAGE_BASE_URL.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: defaults::CRON_SCHEDULE.to_string(),
            run_on_startup: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            directory: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("h2".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters.insert("tokio_cron_scheduler".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Configured API key
    pub fn api_key(&self) -> Result<&ApiKey, ConfigError> {
        self.upstream
            .api_key
            .as_ref()
            .ok_or_else(|| ConfigError::Validation {
                message: format!(
                    "upstream.api_key is not set (set {} or {}__UPSTREAM__API_KEY)",
                    defaults::API_KEY_ENV,
                    defaults::ENV_PREFIX
                ),
            })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Validation { message });

        if self.collector.devices.is_empty() {
            return invalid("collector.devices must list at least one device class".to_string());
        }
        let mut seen = HashSet::new();
        for device in &self.collector.devices {
            if !seen.insert(device) {
                return invalid(format!("collector.devices lists {device} more than once"));
            }
        }
        if self.collector.max_concurrent_pages == 0 {
            return invalid("collector.max_concurrent_pages must be greater than 0".to_string());
        }

        for (name, timeout) in [
            ("upstream.timeout_seconds", self.upstream.timeout_seconds),
            ("storage.timeout_seconds", self.storage.timeout_seconds),
        ] {
            if timeout == 0 {
                return invalid(format!("{name} must be greater than 0"));
            }
        }
        if self.upstream.max_requests_per_second == 0 {
            return invalid("upstream.max_requests_per_second must be greater than 0".to_string());
        }

        for (name, base_url) in [
            ("upstream.base_url", &self.upstream.base_url),
            ("storage.base_url", &self.storage.base_url),
        ] {
            if let Err(e) = url::Url::parse(base_url) {
                return invalid(format!("{name} '{base_url}' is not a valid URL: {e}"));
            }
        }

        if self.schedule.cron.trim().is_empty() {
            return invalid("schedule.cron must not be empty".to_string());
        }

        if self.api_key()?.expose().trim().is_empty() {
            return invalid("upstream.api_key must not be empty".to_string());
        }

        Ok(())
    }
}

/// Builds an [`AppConfig`] from defaults, an optional file and the environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
    api_key_env: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        let file = std::env::var_os(defaults::CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(Self::discover_config_file);

        Self {
            file,
            env_prefix: defaults::ENV_PREFIX.to_string(),
            api_key_env: defaults::API_KEY_ENV.to_string(),
        }
    }
}

impl ConfigLoader {
    /// Loader reading `path` instead of searching for a config file
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn without_file(mut self) -> Self {
        self.file = None;
        self
    }

    #[must_use]
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = name.into();
        self
    }

    /// User config directory first, then the working directory
    fn discover_config_file() -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(defaults::APP_NAME));
        }
        candidates.push(PathBuf::from("."));

        candidates.into_iter().find_map(|dir| {
            ["toml", "json", "yaml"]
                .iter()
                .map(|ext| dir.join(format!("{}.{ext}", defaults::APP_NAME)))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Load from the process environment
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let env = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        self.load_from_env(env)
    }

    /// Load with `env` standing in for the process environment
    pub fn load_from_env(&self, env: HashMap<String, String>) -> Result<AppConfig, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = &self.file {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("collector.devices")
                .source(Some(env.clone())),
        );

        let mut app_config: AppConfig = builder.build()?.try_deserialize()?;

        if app_config.upstream.api_key.is_none() {
            app_config.upstream.api_key = env
                .get(&self.api_key_env)
                .filter(|key| !key.trim().is_empty())
                .map(|key| ApiKey::new(key.as_str()));
        }

        app_config.validate()?;
        Ok(app_config)
    }

    #[must_use]
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// Default configuration values
pub mod defaults {
    use crate::domain::DeviceClass;

    pub const APP_NAME: &str = "crux-collector";

    /// Environment prefix for configuration overrides
    pub const ENV_PREFIX: &str = "CRUX_COLLECTOR";

    /// Explicit configuration file path
    pub const CONFIG_PATH_ENV: &str = "CRUX_COLLECTOR_CONFIG";

    /// Environment variable holding the upstream API key
    pub const API_KEY_ENV: &str = "CRUX_API_KEY";

    pub const DEVICES: &[DeviceClass] = &[DeviceClass::Phone, DeviceClass::Desktop];

    pub const MAX_CONCURRENT_PAGES: usize = 8;

    pub const STORE_PARTIAL_RECORDS: bool = true;

    pub const UPSTREAM_BASE_URL: &str = "https://chromeuxreport.googleapis.com";

    pub const STORAGE_BASE_URL: &str = "http://localhost:4000";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Well under the upstream per-minute quota
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    pub const USER_AGENT: &str = concat!("crux-collector/", env!("CARGO_PKG_VERSION"));

    /// Daily at midnight (sec min hour day month weekday)
    pub const CRON_SCHEDULE: &str = "0 0 0 * * *";

    pub const LOG_LEVEL: &str = "info";

    pub const LOG_FILE_NAME: &str = "crux-collector.log";
}
