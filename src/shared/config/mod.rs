//! Application configuration module
//!
//! Provides configuration types for the offline engine. Every tunable the
//! coordinator depends on (polling interval, polling timeout, unmetered-only
//! downloads) lives here so tests can shrink them.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default interval between job status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default wall-clock limit for one download run
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server URL
    pub server_url: Option<String>,
    /// Root directory for all offline state
    pub data_dir: Option<PathBuf>,
    /// Only auto-download on an unmetered connection
    pub require_unmetered: bool,
    /// Interval between job status polls
    pub poll_interval: Duration,
    /// Wall-clock limit for one download run
    pub poll_timeout: Duration,
    /// Upper bound for a single queued upload, re-checked at flush time
    pub max_upload_bytes: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            data_dir: None,
            require_unmetered: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            max_upload_bytes: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.poll_timeout < self.poll_interval {
            return Err(ConfigError::InvalidValue {
                field: "poll_timeout",
                message: "must not be shorter than poll_interval".to_string(),
            });
        }
        Ok(())
    }

    /// Parse a TOML configuration document
    ///
    /// ```rust
    /// use offline_reader::shared::config::AppConfig;
    ///
    /// let config = AppConfig::from_toml_str(r#"
    ///     server_url = "https://reader.example.com"
    ///     require_unmetered = false
    ///     poll_interval_ms = 500
    /// "#).unwrap();
    /// assert!(!config.require_unmetered);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(source)?;
        let mut builder = AppConfig::builder();
        if let Some(url) = file.server_url {
            builder = builder.server_url(url);
        }
        if let Some(dir) = file.data_dir {
            builder = builder.data_dir(dir);
        }
        if let Some(flag) = file.require_unmetered {
            builder = builder.require_unmetered(flag);
        }
        if let Some(ms) = file.poll_interval_ms {
            builder = builder.poll_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = file.poll_timeout_secs {
            builder = builder.poll_timeout(Duration::from_secs(secs));
        }
        if let Some(bytes) = file.max_upload_bytes {
            builder = builder.max_upload_bytes(bytes);
        }
        builder.build()
    }
}

/// On-disk shape of the TOML configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    server_url: Option<String>,
    data_dir: Option<PathBuf>,
    require_unmetered: Option<bool>,
    poll_interval_ms: Option<u64>,
    poll_timeout_secs: Option<u64>,
    max_upload_bytes: Option<u64>,
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    data_dir: Option<PathBuf>,
    require_unmetered: Option<bool>,
    poll_interval: Option<Duration>,
    poll_timeout: Option<Duration>,
    max_upload_bytes: Option<u64>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the root directory for offline state
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Require an unmetered connection for automatic downloads
    pub fn require_unmetered(mut self, required: bool) -> Self {
        self.require_unmetered = Some(required);
        self
    }

    /// Set the polling interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set the polling timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Set the per-upload size limit
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let defaults = AppConfig::default();
        let config = AppConfig {
            server_url: self.server_url,
            data_dir: self.data_dir,
            require_unmetered: self.require_unmetered.unwrap_or(defaults.require_unmetered),
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            poll_timeout: self.poll_timeout.unwrap_or(defaults.poll_timeout),
            max_upload_bytes: self.max_upload_bytes,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
