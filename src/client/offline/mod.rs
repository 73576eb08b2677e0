//! # Offline Storage
//!
//! Durable local state that lets the reader keep working without a network.
//!
//! ## Architecture
//!
//! - **Page Store**: cached page payloads per document
//! - **Pending Queues**: reading positions and uploads not yet sent
//! - **Documents Index**: last full listing for offline-first browsing
//! - **Optimistic Updates**: local changes awaiting confirmation
//! - **Reconciliation**: replays the queues when the network returns
//!
//! ## Key Components
//!
//! - `page_store.rs`: per-document cache with integrity checks
//! - `position_queue.rs`: last-write-wins reading positions
//! - `upload_queue.rs`: FIFO of files to upload
//! - `documents_index.rs`: wholesale listing snapshot
//! - `optimistic.rs`: optimistic update tracking
//! - `reconciliation.rs`: queue flushing
//!
//! All files are rewritten whole through a temporary file and a rename.

pub mod documents_index;
pub mod optimistic;
pub mod page_store;
pub(crate) mod persist;
pub mod position_queue;
pub mod reconciliation;
pub mod upload_queue;

pub use documents_index::{DocumentsIndex, IndexSnapshot};
pub use optimistic::{Mutation, OptimisticManager, OptimisticUpdate};
pub use page_store::{CacheManifest, OfflinePageStore};
pub use position_queue::{PendingPositionEntry, PendingPositionQueue};
pub use reconciliation::{
    FlushOutcome, FlushReport, MaxUploadSize, Reconciler, Unlimited, UploadPolicy,
};
pub use upload_queue::{
    migrate_legacy_payload, ExternalFile, LocalFile, PendingUploadEntry, PendingUploadQueue,
};

use std::sync::Arc;

use crate::client::config::Config;

/// Every offline store rooted at the configured data directory
#[derive(Debug, Clone)]
pub struct OfflineStores {
    pub pages: OfflinePageStore,
    pub positions: Arc<PendingPositionQueue>,
    pub uploads: Arc<PendingUploadQueue>,
    pub index: DocumentsIndex,
}

impl OfflineStores {
    /// Open the stores at the paths `config` names; nothing is read yet
    pub fn open(config: &Config) -> Self {
        Self {
            pages: OfflinePageStore::new(config.offline_documents_dir()),
            positions: Arc::new(PendingPositionQueue::new(config.pending_positions_path())),
            uploads: Arc::new(PendingUploadQueue::new(config.pending_uploads_dir())),
            index: DocumentsIndex::new(config.documents_index_path()),
        }
    }
}
