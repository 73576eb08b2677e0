use std::path::PathBuf;

use crate::client::sync::SyncSettings;
use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default server URL
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Directory name under the platform data dir
const APP_DIR_NAME: &str = "offline-reader";

/// Application configuration wrapper.
///
/// Adds environment overrides, the bearer token slot, and the on-disk layout
/// of every offline store on top of [`AppConfig`].
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!("Ignoring invalid environment configuration: {}", e);
            Self {
                app: AppConfig::default(),
                token: None,
            }
        })
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `READER_CONFIG` (a TOML file), then `READER_API_URL` and
    /// `READER_DATA_DIR` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut app = match std::env::var("READER_CONFIG") {
            Ok(path) => {
                let source = std::fs::read_to_string(&path)?;
                AppConfig::from_toml_str(&source)?
            }
            Err(_) => AppConfig::default(),
        };
        if let Ok(url) = std::env::var("READER_API_URL") {
            app.server_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Ok(dir) = std::env::var("READER_DATA_DIR") {
            app.data_dir = Some(PathBuf::from(dir));
        }
        app.validate()?;
        Ok(Self { app, token: None })
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app, token: None })
    }

    /// Underlying application settings
    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        self.app.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    /// Root directory for all offline state
    pub fn data_dir(&self) -> PathBuf {
        match &self.app.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME),
        }
    }

    /// Directory holding one subdirectory per cached document
    pub fn offline_documents_dir(&self) -> PathBuf {
        self.data_dir().join("offline_documents")
    }

    /// File holding unsynced reading positions
    pub fn pending_positions_path(&self) -> PathBuf {
        self.data_dir().join("pending_reading_positions.json")
    }

    /// Directory holding the upload manifest and payloads
    pub fn pending_uploads_dir(&self) -> PathBuf {
        self.data_dir().join("pending_uploads")
    }

    /// File holding the offline-first document listing
    pub fn documents_index_path(&self) -> PathBuf {
        self.data_dir().join("documents_index.json")
    }

    /// File holding the ids pinned for offline reading
    pub fn pinned_documents_path(&self) -> PathBuf {
        self.data_dir().join("pinned_documents.json")
    }

    /// Polling and connectivity settings for the coordinator
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            require_unmetered: self.app.require_unmetered,
            poll_interval: self.app.poll_interval,
            poll_timeout: self.app.poll_timeout,
        }
    }

    /// Per-upload size limit, if any
    pub fn max_upload_bytes(&self) -> Option<u64> {
        self.app.max_upload_bytes
    }
}
