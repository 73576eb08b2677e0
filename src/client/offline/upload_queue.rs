//! # Pending Upload Queue
//!
//! Durable list of files the user asked to upload while the service was not
//! reachable. Each entry has a payload file named after its id and a row in
//! the `pending_uploads.json` manifest.
//!
//! ## Layout
//!
//! ```text
//! pending_uploads/
//!   pending_uploads.json      newest entry first
//!   <id>.bin                  payload
//! ```
//!
//! Payloads written by earlier releases used `<id>.pdf`. They are renamed by
//! [`migrate_legacy_payload`] the first time an id is touched.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use offline_reader::client::offline::PendingUploadQueue;
//!
//! # async fn run() -> offline_reader::shared::Result<()> {
//! let queue = PendingUploadQueue::new("/tmp/reader/pending_uploads");
//! let entry = queue.enqueue_bytes(b"%PDF-1.7".to_vec(), "notes.pdf").await?;
//! for pending in queue.list().await? {
//!     let bytes = queue.load_data(&pending.id).await?;
//!     // upload...
//! #   let _ = bytes;
//!     queue.remove(&pending.id).await?;
//! }
//! # let _ = entry;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::client::offline::persist;
use crate::shared::{OfflineError, Result};

const MANIFEST_FILE: &str = "pending_uploads.json";
const PAYLOAD_EXTENSION: &str = "bin";
const LEGACY_PAYLOAD_EXTENSION: &str = "pdf";

/// File waiting to be uploaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingUploadEntry {
    /// Local identifier, also names the payload file
    pub id: Uuid,
    /// Original file name shown to the user and sent to the service
    pub file_name: String,
    /// When the upload was queued
    pub created_at: DateTime<Utc>,
}

/// A file owned by another process or sandbox
///
/// Reading it may require a temporary access grant that must be released
/// afterwards.
pub trait ExternalFile: Send + Sync {
    /// Location of the file
    fn path(&self) -> &Path;

    /// Request access; `false` means the platform refused
    fn start_access(&self) -> bool;

    /// Release access obtained by [`ExternalFile::start_access`]
    fn stop_access(&self);

    /// Name recorded in the queue
    fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string())
    }
}

/// Plain file on a local filesystem, no access grant required
#[derive(Debug, Clone)]
pub struct LocalFile(pub PathBuf);

impl ExternalFile for LocalFile {
    fn path(&self) -> &Path {
        &self.0
    }

    fn start_access(&self) -> bool {
        true
    }

    fn stop_access(&self) {}
}

/// Releases an access grant when dropped
struct AccessGuard<'a> {
    file: &'a dyn ExternalFile,
    granted: bool,
}

impl<'a> AccessGuard<'a> {
    fn acquire(file: &'a dyn ExternalFile) -> Self {
        let granted = file.start_access();
        if !granted {
            tracing::debug!(path = %file.path().display(), "Access grant refused, reading anyway");
        }
        Self { file, granted }
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        if self.granted {
            self.file.stop_access();
        }
    }
}

/// Rename a legacy `<id>.pdf` payload to the current `<id>.bin` name
///
/// Does nothing when the current file exists or no legacy file is present.
pub async fn migrate_legacy_payload(dir: &Path, id: &Uuid) -> Result<()> {
    let current = payload_path(dir, id);
    if tokio::fs::try_exists(&current).await.unwrap_or(false) {
        return Ok(());
    }
    let legacy = dir.join(format!("{}.{}", id, LEGACY_PAYLOAD_EXTENSION));
    if !tokio::fs::try_exists(&legacy).await.unwrap_or(false) {
        return Ok(());
    }
    tokio::fs::rename(&legacy, &current)
        .await
        .map_err(|e| OfflineError::storage(&legacy, e))?;
    tracing::info!(%id, "Migrated legacy upload payload");
    Ok(())
}

fn payload_path(dir: &Path, id: &Uuid) -> PathBuf {
    dir.join(format!("{}.{}", id, PAYLOAD_EXTENSION))
}

/// Durable FIFO of files to upload
#[derive(Debug)]
pub struct PendingUploadQueue {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl PendingUploadQueue {
    /// Create a queue stored under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Directory holding the manifest and payloads
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queue `bytes` for upload under `file_name`
    pub async fn enqueue_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: impl Into<String>,
    ) -> Result<PendingUploadEntry> {
        let file_name = file_name.into();
        if file_name.trim().is_empty() {
            return Err(OfflineError::validation("file_name", "must not be empty"));
        }

        let entry = PendingUploadEntry {
            id: Uuid::new_v4(),
            file_name,
            created_at: Utc::now(),
        };

        let _guard = self.lock.lock().await;
        let payload = payload_path(&self.dir, &entry.id);
        persist::write_atomic_async(&payload, &bytes).await?;

        let mut entries = self.read_manifest().await?;
        entries.insert(0, entry.clone());
        if let Err(e) = persist::write_json_async(&self.manifest_path(), &entries).await {
            let _ = persist::remove_if_exists_async(&payload).await;
            return Err(e);
        }

        tracing::info!(
            id = %entry.id,
            file_name = %entry.file_name,
            bytes = bytes.len(),
            "Queued upload"
        );
        Ok(entry)
    }

    /// Queue a file owned elsewhere, holding its access grant only while
    /// reading
    pub async fn enqueue_file(&self, file: &dyn ExternalFile) -> Result<PendingUploadEntry> {
        let bytes = {
            let _access = AccessGuard::acquire(file);
            tokio::fs::read(file.path())
                .await
                .map_err(|e| OfflineError::storage(file.path(), e))?
        };
        self.enqueue_bytes(bytes, file.file_name()).await
    }

    /// Pending entries in flush order, oldest first
    pub async fn list(&self) -> Result<Vec<PendingUploadEntry>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_manifest().await?;
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    /// Payload for `id`
    pub async fn load_data(&self, id: &Uuid) -> Result<Vec<u8>> {
        let _guard = self.lock.lock().await;
        migrate_legacy_payload(&self.dir, id).await?;
        let path = payload_path(&self.dir, id);
        tokio::fs::read(&path)
            .await
            .map_err(|e| OfflineError::storage(&path, e))
    }

    /// Drop the manifest entry and payload for `id`; missing pieces are ignored
    pub async fn remove(&self, id: &Uuid) -> Result<()> {
        let _guard = self.lock.lock().await;
        migrate_legacy_payload(&self.dir, id).await?;

        let mut entries = self.read_manifest().await?;
        let before = entries.len();
        entries.retain(|e| e.id != *id);
        if entries.len() != before {
            persist::write_json_async(&self.manifest_path(), &entries).await?;
        }
        persist::remove_if_exists_async(&payload_path(&self.dir, id)).await?;

        tracing::debug!(%id, "Removed pending upload");
        Ok(())
    }

    /// Number of queued uploads
    pub async fn count(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.read_manifest().await?.len())
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    async fn read_manifest(&self) -> Result<Vec<PendingUploadEntry>> {
        Ok(persist::read_json_async(&self.manifest_path())
            .await?
            .unwrap_or_default())
    }
}
