//! # Queue Reconciliation
//!
//! Replays the pending position and upload queues against the remote service
//! once connectivity returns.
//!
//! ## Features
//!
//! - **FIFO Flushes**: entries are sent oldest first, one at a time
//! - **Stop On Failure**: the first failure ends the flush so later entries
//!   never overtake earlier ones
//! - **Quota Checks**: every upload is re-validated before it is sent
//! - **No Overlap**: a flush that is already running ignores a re-trigger
//! - **Local Wins**: an unsynced local position beats the remote one
//!
//! The local queue is the source of truth until the service confirms a write;
//! entries are only removed after a successful call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::api::DocumentService;
use crate::client::offline::position_queue::{PendingPositionEntry, PendingPositionQueue};
use crate::client::offline::upload_queue::{PendingUploadEntry, PendingUploadQueue};
use crate::client::sync::NetworkMonitor;
use crate::shared::document::mime_type_for;
use crate::shared::{OfflineError, ReadingPosition, Result, UploadRequest};

/// Checks an upload against the current quota right before sending it
pub trait UploadPolicy: Send + Sync {
    fn check(&self, entry: &PendingUploadEntry, size_bytes: u64) -> Result<()>;
}

/// Accepts every upload
#[derive(Debug, Clone, Copy, Default)]
pub struct Unlimited;

impl UploadPolicy for Unlimited {
    fn check(&self, _entry: &PendingUploadEntry, _size_bytes: u64) -> Result<()> {
        Ok(())
    }
}

/// Rejects uploads larger than a fixed size
#[derive(Debug, Clone, Copy)]
pub struct MaxUploadSize(pub u64);

impl UploadPolicy for MaxUploadSize {
    fn check(&self, entry: &PendingUploadEntry, size_bytes: u64) -> Result<()> {
        if size_bytes > self.0 {
            return Err(OfflineError::quota(format!(
                "{} is {} bytes, the limit is {} bytes",
                entry.file_name, size_bytes, self.0
            )));
        }
        Ok(())
    }
}

/// How a flush ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Every entry was sent
    Completed,
    /// An entry failed; it and every later entry stay queued
    Stopped { reason: String },
    /// Another flush of the same queue was running
    AlreadyRunning,
}

/// Summary of one flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Entries a send was attempted for
    pub attempted: usize,
    /// Entries sent and removed
    pub succeeded: usize,
    /// Entries still queued afterwards
    pub remaining: usize,
    pub outcome: FlushOutcome,
}

impl FlushReport {
    fn skipped(outcome: FlushOutcome, remaining: usize) -> Self {
        Self {
            attempted: 0,
            succeeded: 0,
            remaining,
            outcome,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome == FlushOutcome::Completed
    }
}

/// Resets a running flag when the flush ends
struct FlushGuard<'a>(&'a AtomicBool);

impl<'a> FlushGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Flushes the pending queues against the remote service
pub struct Reconciler {
    service: Arc<dyn DocumentService>,
    positions: Arc<PendingPositionQueue>,
    uploads: Arc<PendingUploadQueue>,
    network: Arc<dyn NetworkMonitor>,
    policy: Arc<dyn UploadPolicy>,
    flushing_uploads: AtomicBool,
    flushing_positions: AtomicBool,
}

impl Reconciler {
    pub fn new(
        service: Arc<dyn DocumentService>,
        positions: Arc<PendingPositionQueue>,
        uploads: Arc<PendingUploadQueue>,
        network: Arc<dyn NetworkMonitor>,
    ) -> Self {
        Self {
            service,
            positions,
            uploads,
            network,
            policy: Arc::new(Unlimited),
            flushing_uploads: AtomicBool::new(false),
            flushing_positions: AtomicBool::new(false),
        }
    }

    /// Replace the upload policy
    pub fn with_policy(mut self, policy: Arc<dyn UploadPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn positions(&self) -> &PendingPositionQueue {
        &self.positions
    }

    pub fn uploads(&self) -> &PendingUploadQueue {
        &self.uploads
    }

    /// Flush both queues independently
    pub async fn on_connectivity_restored(&self) -> (FlushReport, FlushReport) {
        futures_util::future::join(self.flush_uploads(), self.flush_positions()).await
    }

    /// Send queued uploads oldest first, stopping at the first failure
    pub async fn flush_uploads(&self) -> FlushReport {
        let Some(_guard) = FlushGuard::try_acquire(&self.flushing_uploads) else {
            tracing::debug!("Upload flush already running");
            return FlushReport::skipped(FlushOutcome::AlreadyRunning, 0);
        };

        let entries = match self.uploads.list().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read pending uploads: {}", e);
                return FlushReport::skipped(stopped(&e), 0);
            }
        };
        if entries.is_empty() {
            return FlushReport::skipped(FlushOutcome::Completed, 0);
        }
        if !self.network.status().is_online() {
            return FlushReport::skipped(
                FlushOutcome::Stopped {
                    reason: "offline".to_string(),
                },
                entries.len(),
            );
        }

        let total = entries.len();
        let mut attempted = 0;
        let mut succeeded = 0;
        let mut outcome = FlushOutcome::Completed;

        for entry in &entries {
            attempted += 1;
            if let Err(e) = self.send_upload(entry).await {
                tracing::warn!(
                    id = %entry.id,
                    file_name = %entry.file_name,
                    "Upload flush stopped: {}",
                    e
                );
                outcome = stopped(&e);
                break;
            }
            succeeded += 1;
        }

        let remaining = self.uploads.count().await.unwrap_or(total - succeeded);
        tracing::info!(attempted, succeeded, remaining, "Flushed pending uploads");
        FlushReport {
            attempted,
            succeeded,
            remaining,
            outcome,
        }
    }

    async fn send_upload(&self, entry: &PendingUploadEntry) -> Result<()> {
        let bytes = self.uploads.load_data(&entry.id).await?;
        self.policy.check(entry, bytes.len() as u64)?;

        let uploaded = self
            .service
            .upload_document(UploadRequest {
                bytes,
                mime_type: mime_type_for(&entry.file_name).to_string(),
                file_name: entry.file_name.clone(),
            })
            .await?;
        tracing::info!(id = %entry.id, document_id = %uploaded.id, "Uploaded queued document");

        self.uploads.remove(&entry.id).await
    }

    /// Send queued positions oldest first, stopping at the first failure
    pub async fn flush_positions(&self) -> FlushReport {
        let Some(_guard) = FlushGuard::try_acquire(&self.flushing_positions) else {
            tracing::debug!("Position flush already running");
            return FlushReport::skipped(FlushOutcome::AlreadyRunning, 0);
        };

        let entries = match self.positions.list().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read pending positions: {}", e);
                return FlushReport::skipped(stopped(&e), 0);
            }
        };
        if entries.is_empty() {
            return FlushReport::skipped(FlushOutcome::Completed, 0);
        }
        if !self.network.status().is_online() {
            return FlushReport::skipped(
                FlushOutcome::Stopped {
                    reason: "offline".to_string(),
                },
                entries.len(),
            );
        }

        let total = entries.len();
        let mut attempted = 0;
        let mut succeeded = 0;
        let mut outcome = FlushOutcome::Completed;

        for entry in &entries {
            attempted += 1;
            if let Err(e) = self.send_position(entry).await {
                tracing::warn!(document_id = %entry.document_id, "Position flush stopped: {}", e);
                outcome = stopped(&e);
                break;
            }
            succeeded += 1;
        }

        let remaining = self.positions.count().await.unwrap_or(total - succeeded);
        tracing::info!(attempted, succeeded, remaining, "Flushed pending reading positions");
        FlushReport {
            attempted,
            succeeded,
            remaining,
            outcome,
        }
    }

    async fn send_position(&self, entry: &PendingPositionEntry) -> Result<()> {
        self.service
            .put_reading_position(&entry.to_position())
            .await?;
        self.positions.remove_if_unchanged(entry).await?;
        Ok(())
    }

    /// Queue a position and push it right away when online
    ///
    /// A failed push leaves the entry queued for the next flush.
    pub async fn record_position(
        &self,
        document_id: &str,
        page_number: i32,
        progress: f64,
    ) -> Result<PendingPositionEntry> {
        let entry = self
            .positions
            .save(document_id, page_number, progress)
            .await?;

        if self.network.status().is_online() {
            if let Err(e) = self.send_position(&entry).await {
                tracing::debug!(document_id, "Position kept for later sync: {}", e);
            }
        }
        Ok(entry)
    }

    /// Position to restore when opening `document_id`
    ///
    /// An unsynced local entry is newer than anything the service has.
    pub async fn resolve_position(&self, document_id: &str) -> Result<Option<ReadingPosition>> {
        if let Some(pending) = self.positions.get(document_id).await? {
            return Ok(Some(pending.to_position()));
        }
        if !self.network.status().is_online() {
            return Ok(None);
        }
        self.service.get_reading_position(document_id).await
    }
}

fn stopped(error: &OfflineError) -> FlushOutcome {
    FlushOutcome::Stopped {
        reason: error.to_string(),
    }
}
