//! # Offline Sync Coordinator
//!
//! Owns the "keep this document offline" intent and the background download
//! run for each pinned document.
//!
//! ## Architecture
//!
//! - **Coordinator**: pins, unpins and starts one download run per document
//! - **Network Monitor**: decides whether a run may start
//! - **Download State**: per-document `watch` channel observed by the UI
//!
//! ## Download runs
//!
//! A run polls the optimized-document job every `poll_interval`. Pages are
//! saved as soon as they arrive, marked incomplete until the job is ready. The
//! run stops when the job is ready or failed, when a complete copy appears
//! locally, or after `poll_timeout`.
//!
//! Every run carries a generation number. Pinning again or unpinning bumps the
//! generation; a run checks it, under the same lock that guards the page store
//! write, before every side effect. Superseded runs are never aborted, their
//! results are simply discarded.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use offline_reader::client::{Config, HttpDocumentService, OfflinePageStore};
//! use offline_reader::client::sync::{Connectivity, OfflineSyncCoordinator, WatchNetworkMonitor};
//!
//! # async fn run() -> offline_reader::shared::Result<()> {
//! let config = Config::new();
//! let network = Arc::new(WatchNetworkMonitor::new(Connectivity::Unmetered));
//! let coordinator = OfflineSyncCoordinator::builder(
//!     Arc::new(HttpDocumentService::from_config(config.clone())),
//!     network,
//!     OfflinePageStore::new(config.offline_documents_dir()),
//! )
//! .settings(config.sync_settings())
//! .build();
//!
//! let mut state = coordinator.subscribe("doc-1");
//! coordinator.enable("doc-1")?;
//! while state.changed().await.is_ok() {
//!     println!("{}", *state.borrow());
//! }
//! # Ok(())
//! # }
//! ```

pub mod network_monitor;
pub mod sync_state;

pub use network_monitor::{
    spawn_connectivity_listener, Connectivity, NetworkMonitor, WatchNetworkMonitor,
};
pub use sync_state::{DownloadProgress, DownloadState};

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::api::DocumentService;
use crate::client::offline::{persist, OfflinePageStore};
use crate::shared::config::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::shared::{OfflineError, OptimizedDocumentJob, ProcessingStatus, Result};
use sync_state::{DOWNLOAD_FAILED_MESSAGE, STORAGE_FULL_MESSAGE};

/// Polling and connectivity settings for download runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Only download over unmetered connections
    pub require_unmetered: bool,
    /// Delay between job status polls
    pub poll_interval: Duration,
    /// Wall-clock limit of one run
    pub poll_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            require_unmetered: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Result of pinning a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// A complete copy already exists
    AlreadyAvailable,
    /// A download run was started
    Started,
    /// Pinned; the download starts once the connection allows it
    WaitingForNetwork,
}

struct DocumentEntry {
    pinned: bool,
    generation: u64,
    state: watch::Sender<DownloadState>,
    task: Option<JoinHandle<()>>,
    /// Held around every page store write for this document
    writes: Arc<Mutex<()>>,
}

impl DocumentEntry {
    fn new(initial: DownloadState) -> Self {
        let (state, _rx) = watch::channel(initial);
        Self {
            pinned: false,
            generation: 0,
            state,
            task: None,
            writes: Arc::new(Mutex::new(())),
        }
    }

    fn publish(&self, next: DownloadState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

enum Step {
    Continue,
    Finished,
    Stale,
}

struct Inner {
    service: Arc<dyn DocumentService>,
    network: Arc<dyn NetworkMonitor>,
    store: OfflinePageStore,
    settings: SyncSettings,
    pin_file: Option<PathBuf>,
    documents: Mutex<HashMap<String, DocumentEntry>>,
}

impl Inner {
    fn documents(&self) -> MutexGuard<'_, HashMap<String, DocumentEntry>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn initial_state(&self, document_id: &str) -> DownloadState {
        if self.store.is_complete(document_id) {
            DownloadState::Available
        } else {
            DownloadState::Idle
        }
    }

    fn entry<'a>(
        &self,
        documents: &'a mut HashMap<String, DocumentEntry>,
        document_id: &str,
    ) -> &'a mut DocumentEntry {
        documents
            .entry(document_id.to_string())
            .or_insert_with(|| DocumentEntry::new(self.initial_state(document_id)))
    }

    fn save_pins(&self, documents: &HashMap<String, DocumentEntry>) {
        let Some(path) = &self.pin_file else {
            return;
        };
        let mut pinned: Vec<&String> = documents
            .iter()
            .filter(|(_, entry)| entry.pinned)
            .map(|(id, _)| id)
            .collect();
        pinned.sort();
        if let Err(e) = persist::write_json(path, &pinned) {
            tracing::warn!("Could not persist pinned documents: {}", e);
        }
    }

    fn is_current(&self, document_id: &str, generation: u64) -> bool {
        self.live_writes(document_id, generation).is_some()
    }

    /// Write lock of `document_id` if `generation` is still live
    fn live_writes(&self, document_id: &str, generation: u64) -> Option<Arc<Mutex<()>>> {
        self.documents()
            .get(document_id)
            .filter(|entry| entry.pinned && entry.generation == generation)
            .map(|entry| Arc::clone(&entry.writes))
    }

    /// Publish a final state if `generation` is still live
    fn finish(&self, document_id: &str, generation: u64, state: DownloadState) -> bool {
        let documents = self.documents();
        match documents.get(document_id) {
            Some(entry) if entry.pinned && entry.generation == generation => {
                entry.publish(state);
                true
            }
            _ => false,
        }
    }

    /// Persist and publish one poll result if `generation` is still live
    ///
    /// Blocks on disk I/O. Only this document's write lock is held while
    /// saving; the generation is checked again once it is taken, and a newer
    /// run or an unpin waits for the write to finish before touching the
    /// store.
    fn commit(&self, document_id: &str, generation: u64, job: &OptimizedDocumentJob) -> Step {
        let Some(writes) = self.live_writes(document_id, generation) else {
            tracing::debug!(document_id, generation, "Discarding result of superseded download");
            return Step::Stale;
        };
        let _writing = writes.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(document_id, generation) {
            tracing::debug!(document_id, generation, "Discarding result of superseded download");
            return Step::Stale;
        }

        let complete = job.processing_status == ProcessingStatus::Ready;
        let mut failure = None;
        if job.has_pages() {
            let checksum = if complete { job.checksum.as_deref() } else { None };
            let saved = self.store.save(
                document_id,
                job.ready_pages(),
                job.optimized_version.max(1),
                checksum,
                complete,
            );
            match saved {
                Ok(_) => {}
                Err(OfflineError::StorageFull { path }) => {
                    tracing::error!(
                        document_id,
                        path = %path.display(),
                        "Disk full while saving pages"
                    );
                    failure = Some(STORAGE_FULL_MESSAGE);
                }
                Err(e) if complete => {
                    tracing::warn!(document_id, "Could not save finished document: {}", e);
                    failure = Some(DOWNLOAD_FAILED_MESSAGE);
                }
                Err(e) => {
                    tracing::warn!(document_id, "Could not save partial pages: {}", e);
                }
            }
        }

        let (next, step) = match (failure, job.processing_status) {
            (Some(message), _) => (DownloadState::failed(message), Step::Finished),
            (None, ProcessingStatus::Ready) if job.has_pages() => {
                tracing::info!(
                    document_id,
                    pages = job.ready_pages().len(),
                    "Document available offline"
                );
                (DownloadState::Available, Step::Finished)
            }
            (None, ProcessingStatus::Ready) => {
                tracing::warn!(document_id, "Job reported ready without pages");
                (DownloadState::failed(DOWNLOAD_FAILED_MESSAGE), Step::Finished)
            }
            (None, ProcessingStatus::Failed) => {
                tracing::warn!(
                    document_id,
                    reason = ?job.error_message,
                    "Optimized document job failed"
                );
                (DownloadState::failed(DOWNLOAD_FAILED_MESSAGE), Step::Finished)
            }
            (None, ProcessingStatus::Processing) => {
                let progress = DownloadProgress {
                    ready_pages: job.ready_pages().len(),
                    total_pages: job.total_pages,
                    total_bytes: job.size_bytes,
                };
                (DownloadState::Downloading(progress), Step::Continue)
            }
        };

        if self.finish(document_id, generation, next) {
            step
        } else {
            Step::Stale
        }
    }
}

async fn run_download(inner: Arc<Inner>, document_id: String, generation: u64) {
    let deadline = Instant::now() + inner.settings.poll_timeout;
    tracing::info!(document_id = %document_id, generation, "Starting offline download");

    loop {
        if inner.store.is_complete(&document_id) {
            if inner.finish(&document_id, generation, DownloadState::Available) {
                tracing::debug!(document_id = %document_id, "Complete copy already on disk");
            }
            return;
        }
        if !inner.is_current(&document_id, generation) {
            tracing::debug!(document_id = %document_id, generation, "Download superseded");
            return;
        }

        match inner.service.fetch_optimized_job(&document_id).await {
            Ok(job) => {
                let committing = Arc::clone(&inner);
                let id = document_id.clone();
                let step =
                    tokio::task::spawn_blocking(move || committing.commit(&id, generation, &job))
                        .await;
                match step {
                    Ok(Step::Continue) => {}
                    Ok(Step::Finished | Step::Stale) => return,
                    Err(e) => {
                        tracing::error!(document_id = %document_id, "Saving pages panicked: {}", e);
                        inner.finish(
                            &document_id,
                            generation,
                            DownloadState::failed(DOWNLOAD_FAILED_MESSAGE),
                        );
                        return;
                    }
                }
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    document_id = %document_id,
                    "Job status poll failed, will retry: {}",
                    e
                );
            }
            Err(e) => {
                tracing::warn!(document_id = %document_id, "Job status poll rejected: {}", e);
                inner.finish(
                    &document_id,
                    generation,
                    DownloadState::failed(DOWNLOAD_FAILED_MESSAGE),
                );
                return;
            }
        }

        let now = Instant::now();
        if now >= deadline {
            if inner.finish(&document_id, generation, DownloadState::retry_later()) {
                tracing::warn!(
                    document_id = %document_id,
                    "Gave up waiting for optimized document"
                );
            }
            return;
        }
        tokio::time::sleep(inner.settings.poll_interval.min(deadline - now)).await;
    }
}

/// Builder for [`OfflineSyncCoordinator`]
pub struct CoordinatorBuilder {
    service: Arc<dyn DocumentService>,
    network: Arc<dyn NetworkMonitor>,
    store: OfflinePageStore,
    settings: SyncSettings,
    pin_file: Option<PathBuf>,
}

impl CoordinatorBuilder {
    pub fn settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Persist pinned ids to `path` and restore them on build
    pub fn pin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pin_file = Some(path.into());
        self
    }

    pub fn build(self) -> OfflineSyncCoordinator {
        let restored: Vec<String> = match &self.pin_file {
            Some(path) => persist::read_json(path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable pinned documents file: {}", e);
                None
            }),
            None => None,
        }
        .unwrap_or_default();

        let inner = Inner {
            service: self.service,
            network: self.network,
            store: self.store,
            settings: self.settings,
            pin_file: self.pin_file,
            documents: Mutex::new(HashMap::new()),
        };
        {
            let mut documents = inner.documents();
            for id in restored {
                inner.entry(&mut documents, &id).pinned = true;
            }
        }
        OfflineSyncCoordinator {
            inner: Arc::new(inner),
        }
    }
}

/// Pins documents and runs their background downloads
#[derive(Clone)]
pub struct OfflineSyncCoordinator {
    inner: Arc<Inner>,
}

impl OfflineSyncCoordinator {
    /// Create a coordinator with explicit settings and no pin persistence
    pub fn new(
        service: Arc<dyn DocumentService>,
        network: Arc<dyn NetworkMonitor>,
        store: OfflinePageStore,
        settings: SyncSettings,
    ) -> Self {
        Self::builder(service, network, store)
            .settings(settings)
            .build()
    }

    pub fn builder(
        service: Arc<dyn DocumentService>,
        network: Arc<dyn NetworkMonitor>,
        store: OfflinePageStore,
    ) -> CoordinatorBuilder {
        CoordinatorBuilder {
            service,
            network,
            store,
            settings: SyncSettings::default(),
            pin_file: None,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    pub fn store(&self) -> &OfflinePageStore {
        &self.inner.store
    }

    /// Pin `document_id` and start downloading it when possible
    ///
    /// Pinning a document that is already downloading starts a fresh run and
    /// invalidates the previous one.
    pub fn enable(&self, document_id: &str) -> Result<EnableOutcome> {
        if document_id.trim().is_empty() {
            return Err(OfflineError::validation("document_id", "must not be empty"));
        }

        let mut documents = self.inner.documents();
        let entry = self.inner.entry(&mut documents, document_id);
        entry.pinned = true;

        let outcome = if self.inner.store.is_complete(document_id) {
            entry.generation += 1;
            entry.publish(DownloadState::Available);
            EnableOutcome::AlreadyAvailable
        } else if !self.download_allowed() {
            entry.generation += 1;
            entry.publish(DownloadState::WaitingForNetwork);
            EnableOutcome::WaitingForNetwork
        } else {
            self.start_run(entry, document_id);
            EnableOutcome::Started
        };

        self.inner.save_pins(&documents);
        tracing::info!(document_id, ?outcome, "Pinned document for offline reading");
        Ok(outcome)
    }

    /// Unpin `document_id`, invalidate its run and delete its cached copy
    ///
    /// A page write already in progress finishes before the copy is deleted.
    pub fn disable(&self, document_id: &str) -> Result<()> {
        let writes = {
            let mut documents = self.inner.documents();
            let entry = self.inner.entry(&mut documents, document_id);
            entry.pinned = false;
            entry.generation += 1;
            entry.task = None;
            entry.publish(DownloadState::Idle);
            let writes = Arc::clone(&entry.writes);
            self.inner.save_pins(&documents);
            writes
        };

        let _writing = writes.lock().unwrap_or_else(PoisonError::into_inner);
        let deleted = self.inner.store.delete(document_id);
        tracing::info!(document_id, "Unpinned document");
        deleted
    }

    /// Start a new run for a pinned document after a failure or timeout
    pub fn retry(&self, document_id: &str) -> Result<EnableOutcome> {
        if !self.is_pinned(document_id) {
            return Err(OfflineError::validation(
                "document_id",
                "document is not pinned for offline reading",
            ));
        }
        self.enable(document_id)
    }

    /// Start runs for pinned documents that are idle or waiting for network
    ///
    /// Documents with a complete copy are marked available without a run.
    /// Returns the number of runs started.
    pub fn resume_pinned(&self) -> usize {
        let allowed = self.download_allowed();
        let mut documents = self.inner.documents();

        let waiting: Vec<String> = documents
            .iter()
            .filter(|(_, entry)| {
                entry.pinned
                    && !entry.is_running()
                    && matches!(
                        *entry.state.borrow(),
                        DownloadState::Idle | DownloadState::WaitingForNetwork
                    )
            })
            .map(|(id, _)| id.clone())
            .collect();

        let mut started = 0;
        for id in waiting {
            let Some(entry) = documents.get_mut(&id) else {
                continue;
            };
            if self.inner.store.is_complete(&id) {
                entry.publish(DownloadState::Available);
            } else if allowed {
                self.start_run(entry, &id);
                started += 1;
            } else {
                entry.publish(DownloadState::WaitingForNetwork);
            }
        }
        started
    }

    /// Delete cached copies of every document that is not pinned
    pub fn prune_unpinned(&self) -> usize {
        let pinned: HashSet<String> = self.pinned_documents().into_iter().collect();
        self.inner.store.prune_unpinned(&pinned)
    }

    /// Receiver for state changes of `document_id`
    pub fn subscribe(&self, document_id: &str) -> watch::Receiver<DownloadState> {
        let mut documents = self.inner.documents();
        self.inner.entry(&mut documents, document_id).state.subscribe()
    }

    /// Current state of `document_id`
    pub fn state(&self, document_id: &str) -> DownloadState {
        let documents = self.inner.documents();
        match documents.get(document_id) {
            Some(entry) => entry.state.borrow().clone(),
            None => self.inner.initial_state(document_id),
        }
    }

    pub fn is_pinned(&self, document_id: &str) -> bool {
        self.inner
            .documents()
            .get(document_id)
            .is_some_and(|entry| entry.pinned)
    }

    /// Whether the live run for `document_id` is still polling
    pub fn is_downloading(&self, document_id: &str) -> bool {
        self.inner
            .documents()
            .get(document_id)
            .is_some_and(DocumentEntry::is_running)
    }

    /// Pinned document ids, sorted
    pub fn pinned_documents(&self) -> Vec<String> {
        let mut pinned: Vec<String> = self
            .inner
            .documents()
            .iter()
            .filter(|(_, entry)| entry.pinned)
            .map(|(id, _)| id.clone())
            .collect();
        pinned.sort();
        pinned
    }

    /// Wait for the live run of `document_id` to exit
    pub async fn join(&self, document_id: &str) {
        let task = {
            let mut documents = self.inner.documents();
            documents
                .get_mut(document_id)
                .and_then(|entry| entry.task.take())
        };
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(document_id, "Download task ended abnormally: {}", e);
            }
        }
    }

    fn download_allowed(&self) -> bool {
        self.inner
            .network
            .status()
            .allows_download(self.inner.settings.require_unmetered)
    }

    fn start_run(&self, entry: &mut DocumentEntry, document_id: &str) {
        entry.generation += 1;
        entry.publish(DownloadState::Downloading(DownloadProgress::default()));
        entry.task = Some(tokio::spawn(run_download(
            Arc::clone(&self.inner),
            document_id.to_string(),
            entry.generation,
        )));
    }
}
