//! # Document Library
//!
//! In-memory document listing backed by the offline documents index.
//!
//! ## Features
//!
//! - **Offline-first**: the last stored listing is shown before any request
//! - **Wholesale refresh**: a successful full fetch replaces memory and index
//! - **Optimistic favorites**: the flag flips at once and is reverted if the
//!   service rejects the change
//!
//! The index on disk is never patched. A favorite toggle only reaches it with
//! the next successful refresh.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::api::DocumentService;
use crate::client::offline::{DocumentsIndex, Mutation, OptimisticManager};
use crate::shared::{DocumentSummary, OfflineError, Result};

pub struct DocumentLibrary {
    service: Arc<dyn DocumentService>,
    index: DocumentsIndex,
    optimistic: OptimisticManager,
    documents: RwLock<Vec<DocumentSummary>>,
}

impl DocumentLibrary {
    pub fn new(service: Arc<dyn DocumentService>, index: DocumentsIndex) -> Self {
        Self {
            service,
            index,
            optimistic: OptimisticManager::new(),
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Current listing
    pub async fn documents(&self) -> Vec<DocumentSummary> {
        self.documents.read().await.clone()
    }

    /// Populate the listing from the stored index without a network call
    pub async fn load_cached(&self) -> Vec<DocumentSummary> {
        let cached = self
            .index
            .load()
            .await
            .map(|snapshot| snapshot.documents)
            .unwrap_or_default();
        *self.documents.write().await = cached.clone();
        cached
    }

    /// Fetch the full listing and replace memory and index
    ///
    /// On failure the current listing is kept and the error returned.
    pub async fn refresh(&self) -> Result<Vec<DocumentSummary>> {
        let fetched = match self.service.list_documents().await {
            Ok(documents) => documents,
            Err(e) => {
                tracing::warn!("Document listing refresh failed, keeping cached listing: {}", e);
                return Err(e);
            }
        };

        if let Err(e) = self.index.replace(&fetched).await {
            tracing::warn!("Could not rewrite documents index: {}", e);
        }
        *self.documents.write().await = fetched.clone();
        Ok(fetched)
    }

    /// Flip the favorite flag, returning the new value
    pub async fn toggle_favorite(&self, document_id: &str) -> Result<bool> {
        let previous = self
            .set_local_favorite(document_id, None)
            .await
            .ok_or_else(|| OfflineError::validation("document_id", "unknown document"))?;
        let value = !previous;
        self.set_local_favorite(document_id, Some(value)).await;

        let update_id = self
            .optimistic
            .apply_update(document_id, Mutation::SetFavorite { previous, value })
            .await;

        match self.service.set_favorite(document_id, value).await {
            Ok(()) => {
                self.optimistic.confirm_update(&update_id).await;
                Ok(value)
            }
            Err(e) => {
                if let Some(update) = self.optimistic.rollback_update(&update_id).await {
                    let inverse = update.mutation.inverse();
                    if let Mutation::SetFavorite { value: restored, .. } = inverse {
                        self.set_local_favorite(document_id, Some(restored)).await;
                    }
                }
                tracing::warn!(document_id, "Favorite change rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Whether a favorite change for `document_id` is still unconfirmed
    pub async fn has_pending_change(&self, document_id: &str) -> bool {
        self.optimistic.has_pending_for(document_id).await
    }

    /// Read, and optionally overwrite, the in-memory flag; returns the old value
    async fn set_local_favorite(&self, document_id: &str, value: Option<bool>) -> Option<bool> {
        let mut documents = self.documents.write().await;
        let document = documents.iter_mut().find(|d| d.id == document_id)?;
        let old = document.is_favorite;
        if let Some(value) = value {
            document.is_favorite = value;
        }
        Some(old)
    }
}
