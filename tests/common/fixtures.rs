//! Test environment fixtures
//!
//! Every test gets its own data directory, a settable network monitor and a
//! scripted service, wired together the way the application wires them.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use offline_reader::client::offline::{OfflineStores, Reconciler};
use offline_reader::client::pagination::Paginator;
use offline_reader::client::sync::{
    Connectivity, OfflineSyncCoordinator, SyncSettings, WatchNetworkMonitor,
};
use offline_reader::client::{Config, DocumentReader};
use offline_reader::shared::{AppConfig, OptimizedDocumentJob, ProcessingStatus, Result};

use super::mock_service::MockDocumentService;

pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
    pub stores: OfflineStores,
    pub network: Arc<WatchNetworkMonitor>,
    pub service: Arc<MockDocumentService>,
}

impl TestEnv {
    pub fn new(connectivity: Connectivity) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = Config::with_builder(AppConfig::builder().data_dir(dir.path()))
            .expect("Invalid test configuration");
        let stores = OfflineStores::open(&config);
        Self {
            dir,
            config,
            stores,
            network: Arc::new(WatchNetworkMonitor::new(connectivity)),
            service: MockDocumentService::new(),
        }
    }

    pub fn coordinator(&self, settings: SyncSettings) -> OfflineSyncCoordinator {
        OfflineSyncCoordinator::builder(
            self.service.clone(),
            self.network.clone(),
            self.stores.pages.clone(),
        )
        .settings(settings)
        .pin_file(self.config.pinned_documents_path())
        .build()
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.service.clone(),
            self.stores.positions.clone(),
            self.stores.uploads.clone(),
            self.network.clone(),
        )
    }

    pub fn reader(&self) -> DocumentReader {
        DocumentReader::new(
            self.service.clone(),
            self.stores.pages.clone(),
            self.network.clone(),
            Arc::new(LinePaginator),
        )
    }
}

/// One page per non-empty paragraph
pub struct LinePaginator;

impl Paginator for LinePaginator {
    fn paginate(&self, text: &str) -> Vec<String> {
        text.split("\n\n")
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Polling settings small enough for tests
pub fn fast_settings() -> SyncSettings {
    SyncSettings {
        require_unmetered: true,
        poll_interval: Duration::from_millis(5),
        poll_timeout: Duration::from_secs(2),
    }
}

pub fn pages(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("Page {} text", i)).collect()
}

/// Job carrying the first `ready` of `total` pages
pub fn job(
    document_id: &str,
    status: ProcessingStatus,
    ready: usize,
    total: u32,
) -> Result<OptimizedDocumentJob> {
    Ok(OptimizedDocumentJob {
        document_id: document_id.to_string(),
        processing_status: status,
        optimized_version: 3,
        checksum: Some(format!("{}-v3", document_id)),
        size_bytes: Some(i64::from(total) * 1000),
        total_pages: Some(total),
        pages: Some(pages(ready)),
        error_message: None,
    })
}
