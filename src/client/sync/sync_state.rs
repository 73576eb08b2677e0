//! # Download State
//!
//! Observable per-document state published by the coordinator.
//!
//! ## Features
//!
//! - **State Tracking**: idle, waiting, downloading, available or failed
//! - **Progress Estimates**: approximate bytes derived from page counts
//! - **User Messages**: the only two failure texts shown to users

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shown when the job failed or the document could not be saved
pub const DOWNLOAD_FAILED_MESSAGE: &str = "Download failed. Try again.";

/// Shown when polling gave up before the document was ready
pub const RETRY_LATER_MESSAGE: &str = "The document is still being prepared. Try again later.";

/// Shown when the disk filled up while saving pages
pub const STORAGE_FULL_MESSAGE: &str = "Not enough storage to keep this document offline.";

/// Offline availability of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DownloadState {
    /// Not pinned, or pinned with nothing started yet
    #[default]
    Idle,
    /// Pinned, but the connection does not allow downloading
    WaitingForNetwork,
    /// A download run is polling the service
    Downloading(DownloadProgress),
    /// A complete copy is stored locally
    Available,
    /// The run stopped and will not retry on its own
    Failed {
        /// User-facing text
        message: String,
    },
    /// Polling timed out; the user may retry
    RetryLater {
        /// User-facing text
        message: String,
    },
}

impl DownloadState {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn retry_later() -> Self {
        Self::RetryLater {
            message: RETRY_LATER_MESSAGE.to_string(),
        }
    }

    /// Whether a download run owns this state
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::Downloading(_))
    }

    /// User-facing failure text, if any
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } | Self::RetryLater { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "not downloaded"),
            Self::WaitingForNetwork => write!(f, "waiting for Wi-Fi"),
            Self::Downloading(progress) => write!(f, "downloading ({})", progress),
            Self::Available => write!(f, "available offline"),
            Self::Failed { message } | Self::RetryLater { message } => write!(f, "{}", message),
        }
    }
}

/// Progress of a download run
///
/// Byte counts are estimates: the service only reports the size of the whole
/// document, so partial sizes are scaled by the fraction of pages received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    /// Pages received so far
    pub ready_pages: usize,
    /// Pages expected in total, when known
    pub total_pages: Option<u32>,
    /// Size of the complete document, when known
    pub total_bytes: Option<i64>,
}

impl DownloadProgress {
    /// `(ready / total) * size`, rounded down
    pub fn estimated_bytes(&self) -> Option<i64> {
        let total_pages = i64::from(self.total_pages.filter(|t| *t > 0)?);
        let size = self.total_bytes.filter(|s| *s >= 0)?;
        let ready = i64::try_from(self.ready_pages).ok()?.min(total_pages);
        Some(ready.saturating_mul(size) / total_pages)
    }

    /// Received fraction in `0.0..=1.0`, when the total is known
    pub fn fraction(&self) -> Option<f64> {
        let total = f64::from(self.total_pages.filter(|t| *t > 0)?);
        Some((self.ready_pages as f64 / total).min(1.0))
    }
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.total_pages, self.estimated_bytes(), self.total_bytes) {
            (Some(total), Some(estimate), Some(size)) => write!(
                f,
                "{} of {} pages, about {} of {}",
                self.ready_pages,
                total,
                format_bytes(estimate),
                format_bytes(size)
            ),
            (Some(total), _, _) => write!(f, "{} of {} pages", self.ready_pages, total),
            _ => write!(f, "{} pages", self.ready_pages),
        }
    }
}

fn format_bytes(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let value = bytes as f64;
    if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.0} KB", value / KB)
    } else {
        format!("{} B", bytes)
    }
}
