//! # Optimistic Updates
//!
//! Tracks local mutations that are shown to the user before the service
//! confirms them.
//!
//! ## Features
//!
//! - **Immediate Feedback**: the caller applies the mutation locally first
//! - **Rollback Support**: a failed remote call returns the update so the
//!   caller can apply [`Mutation::inverse`]
//! - **Confirmation**: confirmed updates are simply forgotten
//! - **State Tracking**: pending updates can be queried per document
//!
//! ## Usage
//!
//! ```rust,no_run
//! use offline_reader::client::offline::{Mutation, OptimisticManager};
//!
//! # async fn run(remote_ok: bool) {
//! let manager = OptimisticManager::new();
//! let id = manager
//!     .apply_update("doc-1", Mutation::SetFavorite { previous: false, value: true })
//!     .await;
//!
//! if remote_ok {
//!     manager.confirm_update(&id).await;
//! } else if let Some(update) = manager.rollback_update(&id).await {
//!     let undo = update.mutation.inverse();
//!     // apply `undo` to local state
//! #   let _ = undo;
//! }
//! # }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Optimistic update manager
#[derive(Debug, Default)]
pub struct OptimisticManager {
    /// Pending optimistic updates
    updates: RwLock<HashMap<Uuid, OptimisticUpdate>>,
}

/// Local change awaiting confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimisticUpdate {
    /// Unique update ID
    pub id: Uuid,
    /// Document the mutation applies to
    pub document_id: String,
    /// What was changed locally
    pub mutation: Mutation,
    /// When the mutation was applied
    pub applied_at: DateTime<Utc>,
}

/// Reversible local mutation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Favorite flag flipped
    SetFavorite {
        /// Value before the change
        previous: bool,
        /// Value shown now
        value: bool,
    },
    /// Reading position moved
    SetPosition {
        /// Page before the change
        previous_page: i32,
        /// Progress before the change
        previous_progress: f64,
        /// Page shown now
        page: i32,
        /// Progress shown now
        progress: f64,
    },
}

impl Mutation {
    /// Mutation that restores the previous state
    pub fn inverse(&self) -> Mutation {
        match *self {
            Mutation::SetFavorite { previous, value } => Mutation::SetFavorite {
                previous: value,
                value: previous,
            },
            Mutation::SetPosition {
                previous_page,
                previous_progress,
                page,
                progress,
            } => Mutation::SetPosition {
                previous_page: page,
                previous_progress: progress,
                page: previous_page,
                progress: previous_progress,
            },
        }
    }
}

impl OptimisticManager {
    /// Create a new optimistic manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation that was just applied locally
    pub async fn apply_update(&self, document_id: &str, mutation: Mutation) -> Uuid {
        let update = OptimisticUpdate {
            id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            mutation,
            applied_at: Utc::now(),
        };
        let id = update.id;

        let mut updates = self.updates.write().await;
        updates.insert(id, update);
        id
    }

    /// Forget an update the service accepted
    pub async fn confirm_update(&self, update_id: &Uuid) -> bool {
        let mut updates = self.updates.write().await;
        updates.remove(update_id).is_some()
    }

    /// Take back an update the service rejected
    ///
    /// The caller applies `update.mutation.inverse()` to its local state.
    pub async fn rollback_update(&self, update_id: &Uuid) -> Option<OptimisticUpdate> {
        let mut updates = self.updates.write().await;
        let update = updates.remove(update_id);
        if let Some(update) = &update {
            tracing::debug!(document_id = %update.document_id, "Rolled back optimistic update");
        }
        update
    }

    /// All pending updates, oldest first
    pub async fn get_pending_updates(&self) -> Vec<OptimisticUpdate> {
        let updates = self.updates.read().await;
        let mut pending: Vec<_> = updates.values().cloned().collect();
        pending.sort_by_key(|u| u.applied_at);
        pending
    }

    /// Whether `document_id` has an unconfirmed update
    pub async fn has_pending_for(&self, document_id: &str) -> bool {
        let updates = self.updates.read().await;
        updates.values().any(|u| u.document_id == document_id)
    }

    /// Get the count of pending optimistic updates
    pub async fn count_pending(&self) -> usize {
        let updates = self.updates.read().await;
        updates.len()
    }

    /// Clear all optimistic updates (e.g., on app restart)
    pub async fn clear_all(&self) {
        let mut updates = self.updates.write().await;
        updates.clear();
    }
}
