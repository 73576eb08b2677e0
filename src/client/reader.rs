//! Opening documents for reading.
//!
//! A valid cached copy is always preferred. Copies a download is still filling
//! in do not count. Without a valid copy the reader paginates the live content
//! blocks, and when that is impossible because the device is offline it
//! reports [`OfflineError::OfflineUnavailable`].

use std::sync::Arc;

use crate::client::api::DocumentService;
use crate::client::offline::OfflinePageStore;
use crate::client::pagination::{paginate_with_fallback, Paginator};
use crate::client::sync::NetworkMonitor;
use crate::shared::{OfflineError, Result};

/// Where the pages came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSource {
    Offline,
    Live,
}

/// Pages ready for display
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedDocument {
    pub pages: Vec<String>,
    pub source: PageSource,
}

pub struct DocumentReader {
    service: Arc<dyn DocumentService>,
    store: OfflinePageStore,
    network: Arc<dyn NetworkMonitor>,
    paginator: Arc<dyn Paginator>,
}

impl DocumentReader {
    pub fn new(
        service: Arc<dyn DocumentService>,
        store: OfflinePageStore,
        network: Arc<dyn NetworkMonitor>,
        paginator: Arc<dyn Paginator>,
    ) -> Self {
        Self {
            service,
            store,
            network,
            paginator,
        }
    }

    /// Pages of `document_id`, from the cache when it is valid
    ///
    /// `expected_checksum` is the checksum the listing advertises for the
    /// current version; a cached copy with a different checksum is ignored.
    pub async fn open_pages(
        &self,
        document_id: &str,
        expected_checksum: Option<&str>,
    ) -> Result<OpenedDocument> {
        if let Some(pages) = self.cached_pages(document_id, expected_checksum) {
            tracing::debug!(document_id, pages = pages.len(), "Opened offline copy");
            return Ok(OpenedDocument {
                pages,
                source: PageSource::Offline,
            });
        }

        if !self.network.status().is_online() {
            return Err(OfflineError::OfflineUnavailable {
                document_id: document_id.to_string(),
            });
        }

        let blocks = self.service.fetch_content_blocks(document_id).await?;
        let pages = paginate_with_fallback(&blocks, self.paginator.as_ref());
        tracing::debug!(
            document_id,
            blocks = blocks.len(),
            pages = pages.len(),
            "Opened live copy"
        );
        Ok(OpenedDocument {
            pages,
            source: PageSource::Live,
        })
    }

    /// Cached pages, only from a finished download
    fn cached_pages(
        &self,
        document_id: &str,
        expected_checksum: Option<&str>,
    ) -> Option<Vec<String>> {
        if !self.store.is_complete(document_id) {
            if self.store.has_local_copy(document_id) {
                tracing::debug!(document_id, "Skipping partial offline copy");
            }
            return None;
        }
        self.store.load(document_id, expected_checksum)
    }
}
