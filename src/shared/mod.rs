//! Shared Module
//!
//! Platform-agnostic types used by every part of the offline engine: the
//! document data model exchanged with the remote service, the crate error
//! type, and application configuration.

/// Document data structures
pub mod document;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use document::{
    ContentBlock, DocumentSummary, OptimizedDocumentJob, ProcessingStatus, ReadingPosition,
    UploadRequest, UploadedDocument,
};
pub use error::{OfflineError, Result};
