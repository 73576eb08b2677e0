//! Offline-first document listing.
//!
//! `documents_index.json` mirrors the last successful full listing from the
//! service. It is regenerated wholesale and never patched in place, so the
//! only write operation is [`DocumentsIndex::replace`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::offline::persist;
use crate::shared::{DocumentSummary, Result};

/// On-disk shape of the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexSnapshot {
    /// When the listing was fetched
    pub generated_at: DateTime<Utc>,
    /// Listing rows in service order
    pub documents: Vec<DocumentSummary>,
}

/// Cached listing backed by a single JSON file
#[derive(Debug, Clone)]
pub struct DocumentsIndex {
    path: PathBuf,
}

impl DocumentsIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last stored snapshot; `None` when there is none or it cannot be read
    pub async fn load(&self) -> Option<IndexSnapshot> {
        match persist::read_json_async(&self.path).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Ignoring unreadable documents index: {}",
                    e
                );
                None
            }
        }
    }

    /// Replace the whole index with `documents`
    pub async fn replace(&self, documents: &[DocumentSummary]) -> Result<IndexSnapshot> {
        let snapshot = IndexSnapshot {
            generated_at: Utc::now(),
            documents: documents.to_vec(),
        };
        persist::write_json_async(&self.path, &snapshot).await?;
        tracing::debug!(documents = documents.len(), "Rewrote documents index");
        Ok(snapshot)
    }
}
