//! Offline Engine Error Types
//!
//! This module defines the single error type used across the offline engine.
//! Errors are grouped by how callers are expected to react to them:
//!
//! - *Transient* failures (`Network`, 5xx `Remote`) are retried by the polling
//!   loop or the next queue flush and are never surfaced on their own.
//! - *Storage* failures (`Storage`, `StorageFull`) mean "the local write did not
//!   happen"; existing good state on disk is left untouched.
//! - *Terminal* failures (`DownloadFailed`, `OfflineUnavailable`) are the only
//!   ones that become user-visible messages.
//!
//! # Usage
//!
//! ```rust
//! use offline_reader::shared::error::OfflineError;
//!
//! let error = OfflineError::validation("progress", "must be within 0..=1");
//! assert!(!error.is_transient());
//! ```
//!
//! # Thread Safety
//!
//! `OfflineError` is `Clone + Send + Sync`; I/O and HTTP sources are captured as
//! messages so the error can be broadcast through `watch` channels.
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, OfflineError>;

/// Errors produced by the offline engine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OfflineError {
    /// Local file I/O failed
    #[error("Storage error at {}: {message}", path.display())]
    Storage {
        /// File or directory being accessed
        path: PathBuf,
        /// Human-readable error message
        message: String,
    },

    /// The device ran out of space while writing
    #[error("Not enough storage to write {}", path.display())]
    StorageFull {
        /// File being written when the disk filled up
        path: PathBuf,
    },

    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Human-readable error message
        message: String,
    },

    /// The request never reached the remote service
    #[error("Network error: {message}")]
    Network {
        /// Human-readable error message
        message: String,
    },

    /// The remote service answered with a non-success status
    #[error("Remote service error {status}: {message}")]
    Remote {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// No bearer token is available
    #[error("Not authenticated")]
    Unauthenticated,

    /// Input rejected before any I/O happened
    #[error("Validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// A pending upload no longer fits the current quota
    #[error("Upload quota exceeded: {message}")]
    QuotaExceeded {
        /// Human-readable error message
        message: String,
    },

    /// The document was requested while offline and has no valid cached copy
    #[error("Offline copy unavailable for document {document_id}")]
    OfflineUnavailable {
        /// Requested document
        document_id: String,
    },

    /// The server-side processing job failed or never finished
    #[error("Download failed: {message}")]
    DownloadFailed {
        /// Human-readable error message
        message: String,
    },
}

impl OfflineError {
    /// Wrap an I/O error for `path`, keeping disk-full distinct
    pub fn storage(path: impl AsRef<Path>, err: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if err.kind() == io::ErrorKind::StorageFull {
            return Self::StorageFull { path };
        }
        Self::Storage {
            path,
            message: err.to_string(),
        }
    }

    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new remote status error
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new quota error
    pub fn quota(message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    /// Create a new download failure
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Whether the error came from the local disk
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::StorageFull { .. })
    }
}

impl From<serde_json::Error> for OfflineError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}

impl From<reqwest::Error> for OfflineError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::remote(status.as_u16(), err.to_string()),
            None if err.is_decode() => Self::serialization(err.to_string()),
            None => Self::network(err.to_string()),
        }
    }
}
