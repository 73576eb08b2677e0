//! # Offline Page Store
//!
//! Durable cache of optimized (pre-paginated) documents, one directory per
//! document:
//!
//! ```text
//! offline_documents/
//! └── <document id>/
//!     ├── pages.json      ordered array of page strings
//!     └── manifest.json   CacheManifest
//! ```
//!
//! ## Write ordering
//!
//! `save` stages the new payload next to the old one first. Only once that
//! write succeeded is the old manifest removed, the staged payload renamed
//! into place and the new manifest written. A failed write therefore leaves
//! the previous copy readable, and a crash leaves either the old copy, no
//! manifest (treated as no cache) or a manifest describing the payload next to
//! it. The read path treats "manifest without payload" as absent too, so the
//! store heals itself without a repair pass.
//!
//! ## Integrity
//!
//! `load` only returns pages when the caller's expected checksum is absent or
//! equal to the manifest's. Any mismatch, missing file or corrupt JSON is a
//! cache miss, never an error: the caller re-downloads.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::offline::persist;
use crate::shared::{OfflineError, Result};

const MANIFEST_FILE: &str = "manifest.json";
const PAGES_FILE: &str = "pages.json";
const STAGED_PAGES_FILE: &str = "pages.json.staged";

/// Metadata describing one cached page payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheManifest {
    /// Cached document
    #[serde(rename = "documentID")]
    pub document_id: String,
    /// Optimized version, always `>= 1`
    pub version: u32,
    /// Checksum of the complete payload, as reported by the service
    pub checksum: Option<String>,
    /// When this copy was written
    pub saved_at: DateTime<Utc>,
    /// Number of pages in `pages.json`
    #[serde(default)]
    pub page_count: usize,
    /// `false` while a download is still saving partial results
    #[serde(default = "default_complete")]
    pub complete: bool,
}

fn default_complete() -> bool {
    true
}

/// Per-document cache of page payloads
#[derive(Debug, Clone)]
pub struct OfflinePageStore {
    root: PathBuf,
}

impl OfflinePageStore {
    /// Create a store rooted at `root`; the directory is created lazily
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `pages` for `document_id`, replacing any previous copy
    pub fn save(
        &self,
        document_id: &str,
        pages: &[String],
        version: u32,
        checksum: Option<&str>,
        complete: bool,
    ) -> Result<CacheManifest> {
        if version < 1 {
            return Err(OfflineError::validation("version", "must be at least 1"));
        }
        let dir = self.document_dir(document_id)?;
        let manifest_path = dir.join(MANIFEST_FILE);

        let staged = dir.join(STAGED_PAGES_FILE);
        persist::write_json(&staged, pages)?;

        if let Err(e) = persist::remove_if_exists(&manifest_path) {
            let _ = persist::remove_if_exists(&staged);
            return Err(e);
        }
        std::fs::rename(&staged, dir.join(PAGES_FILE))
            .map_err(|e| OfflineError::storage(&staged, e))?;

        let manifest = CacheManifest {
            document_id: document_id.to_string(),
            version,
            checksum: checksum.filter(|c| !c.is_empty()).map(str::to_string),
            saved_at: Utc::now(),
            page_count: pages.len(),
            complete,
        };
        persist::write_json(&manifest_path, &manifest)?;

        tracing::debug!(
            document_id,
            version,
            pages = pages.len(),
            complete,
            "Saved offline copy"
        );
        Ok(manifest)
    }

    /// Cached pages, or `None` on any miss
    pub fn load(&self, document_id: &str, expected_checksum: Option<&str>) -> Option<Vec<String>> {
        let manifest = self.manifest(document_id)?;

        if let Some(expected) = expected_checksum.filter(|c| !c.is_empty()) {
            if manifest.checksum.as_deref() != Some(expected) {
                tracing::debug!(
                    document_id,
                    expected,
                    stored = ?manifest.checksum,
                    "Checksum mismatch, treating cache as stale"
                );
                return None;
            }
        }

        let dir = self.document_dir(document_id).ok()?;
        match persist::read_json::<Vec<String>>(&dir.join(PAGES_FILE)) {
            Ok(Some(pages)) if pages.len() == manifest.page_count || manifest.page_count == 0 => {
                Some(pages)
            }
            Ok(Some(pages)) => {
                tracing::warn!(
                    document_id,
                    expected = manifest.page_count,
                    found = pages.len(),
                    "Page payload does not match manifest"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(document_id, "Unreadable page payload: {}", e);
                None
            }
        }
    }

    /// Manifest for `document_id`, only when its payload also exists
    pub fn manifest(&self, document_id: &str) -> Option<CacheManifest> {
        let dir = self.document_dir(document_id).ok()?;
        if !dir.join(PAGES_FILE).is_file() {
            return None;
        }
        match persist::read_json::<CacheManifest>(&dir.join(MANIFEST_FILE)) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(document_id, "Unreadable cache manifest: {}", e);
                None
            }
        }
    }

    /// Whether a manifest and its payload both exist
    pub fn has_local_copy(&self, document_id: &str) -> bool {
        self.manifest(document_id).is_some()
    }

    /// Whether the local copy is a finished download
    pub fn is_complete(&self, document_id: &str) -> bool {
        self.manifest(document_id).is_some_and(|m| m.complete)
    }

    /// Remove the cached copy; absent copies are not an error
    pub fn delete(&self, document_id: &str) -> Result<()> {
        let dir = self.document_dir(document_id)?;
        remove_dir(&dir)?;
        tracing::debug!(document_id, "Deleted offline copy");
        Ok(())
    }

    /// Remove every cached document not in `pinned`, returning how many were
    /// removed. Individual failures are logged and skipped.
    pub fn prune_unpinned(&self, pinned: &HashSet<String>) -> usize {
        let keep: HashSet<String> = pinned.iter().map(|id| dir_name(id)).collect();
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Cannot list offline documents: {}", e);
                }
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if keep.contains(&name) || !entry.path().is_dir() {
                continue;
            }
            match remove_dir(&entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!(directory = %name, "Failed to prune offline copy: {}", e),
            }
        }
        if removed > 0 {
            tracing::info!(removed, "Pruned unpinned offline copies");
        }
        removed
    }

    /// Identifiers of every document with a readable manifest
    pub fn cached_documents(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut ids: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                persist::read_json::<CacheManifest>(&entry.path().join(MANIFEST_FILE))
                    .ok()
                    .flatten()
            })
            .map(|manifest| manifest.document_id)
            .filter(|id| self.has_local_copy(id))
            .collect();
        ids.sort();
        ids
    }

    /// Remove every cached document
    pub fn clear_all(&self) -> Result<()> {
        remove_dir(&self.root)
    }

    fn document_dir(&self, document_id: &str) -> Result<PathBuf> {
        if document_id.trim().is_empty() {
            return Err(OfflineError::validation("document_id", "must not be empty"));
        }
        Ok(self.root.join(dir_name(document_id)))
    }
}

/// Filesystem-safe directory name for a document id
fn dir_name(document_id: &str) -> String {
    document_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn remove_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(OfflineError::storage(dir, e)),
    }
}
