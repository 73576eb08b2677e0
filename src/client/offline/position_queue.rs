//! # Pending Position Queue
//!
//! Durable list of reading positions that have not reached the remote service
//! yet, stored in `pending_reading_positions.json`.
//!
//! At most one entry exists per document: saving a new position removes the
//! old one and appends the new one (last write wins, no history). Entries are
//! removed only after the reconciler confirms the remote write.
//!
//! Every mutation is a read-modify-write of the whole file under a mutex, so
//! concurrent callers never lose each other's updates.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::offline::persist;
use crate::shared::{OfflineError, ReadingPosition, Result};

/// Reading position waiting to be synced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingPositionEntry {
    /// Document being read
    #[serde(rename = "documentID")]
    pub document_id: String,
    /// 1-based page number
    pub page_number: i32,
    /// Fraction read, clamped to `0.0..=1.0`
    pub progress: f64,
    /// When the position was recorded locally
    pub updated_at: DateTime<Utc>,
}

impl PendingPositionEntry {
    /// Remote payload for this entry
    pub fn to_position(&self) -> ReadingPosition {
        ReadingPosition {
            document_id: self.document_id.clone(),
            page_number: self.page_number,
            progress: self.progress,
        }
    }
}

/// Durable last-write-wins queue of reading positions
#[derive(Debug)]
pub struct PendingPositionQueue {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl PendingPositionQueue {
    /// Create a queue persisted at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Record a position, replacing any pending one for the same document
    pub async fn save(
        &self,
        document_id: &str,
        page_number: i32,
        progress: f64,
    ) -> Result<PendingPositionEntry> {
        if document_id.trim().is_empty() {
            return Err(OfflineError::validation("document_id", "must not be empty"));
        }
        if !progress.is_finite() {
            return Err(OfflineError::validation("progress", "must be a finite number"));
        }

        let entry = PendingPositionEntry {
            document_id: document_id.to_string(),
            page_number,
            progress: progress.clamp(0.0, 1.0),
            updated_at: Utc::now(),
        };

        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.retain(|e| e.document_id != document_id);
        entries.push(entry.clone());
        persist::write_json_async(&self.path, &entries).await?;

        tracing::debug!(document_id, page_number, "Queued reading position");
        Ok(entry)
    }

    /// Pending entry for `document_id`
    pub async fn get(&self, document_id: &str) -> Result<Option<PendingPositionEntry>> {
        let _guard = self.lock.lock().await;
        let entries = self.read_entries().await?;
        Ok(entries.into_iter().find(|e| e.document_id == document_id))
    }

    /// All pending entries, oldest first
    pub async fn list(&self) -> Result<Vec<PendingPositionEntry>> {
        let _guard = self.lock.lock().await;
        self.read_entries().await
    }

    /// Drop the entry for `document_id`; missing entries are not an error
    pub async fn remove(&self, document_id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        let before = entries.len();
        entries.retain(|e| e.document_id != document_id);
        if entries.len() != before {
            persist::write_json_async(&self.path, &entries).await?;
        }
        Ok(())
    }

    /// Drop the entry only if it is still the one that was synced
    ///
    /// A newer position recorded while the sync was in flight stays queued.
    pub async fn remove_if_unchanged(&self, synced: &PendingPositionEntry) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_entries().await?;
        let before = entries.len();
        entries.retain(|e| e != synced);
        if entries.len() == before {
            return Ok(false);
        }
        persist::write_json_async(&self.path, &entries).await?;
        Ok(true)
    }

    /// Number of pending entries
    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    async fn read_entries(&self) -> Result<Vec<PendingPositionEntry>> {
        Ok(persist::read_json_async(&self.path).await?.unwrap_or_default())
    }
}
