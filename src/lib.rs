//! Offline Reader - Main Library
//!
//! Offline Reader is the client-side engine of a document reader that keeps
//! working, and keeps the user's reading position accurate, when the network
//! is unreliable.
//!
//! # Overview
//!
//! This library provides:
//! - Page assembly from the remote service's content blocks
//! - A durable per-document page cache with integrity checks
//! - Background downloads of pinned documents with save-as-you-go progress
//! - Durable queues for reading positions and uploads
//! - Reconciliation of those queues when connectivity returns
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared by every component
//!   - Document data model, error type, configuration
//!
//! - **`client`** - The offline engine
//!   - Remote service client, page store, queues, coordinator, reconciler
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use offline_reader::client::{Config, HttpDocumentService, OfflineStores, Reconciler};
//! use offline_reader::client::sync::{Connectivity, WatchNetworkMonitor};
//!
//! # async fn example() {
//! let config = Config::new();
//! let stores = OfflineStores::open(&config);
//! let network = Arc::new(WatchNetworkMonitor::new(Connectivity::Unmetered));
//! let reconciler = Reconciler::new(
//!     Arc::new(HttpDocumentService::from_config(config.clone())),
//!     stores.positions.clone(),
//!     stores.uploads.clone(),
//!     network,
//! );
//! reconciler.record_position("doc-1", 12, 0.4).await.ok();
//! # }
//! ```
//!
//! # Thread Safety
//!
//! - Stores serialize their own file rewrites; they can be shared through `Arc`
//! - The coordinator is `Clone` and may be driven from any task
//! - All remote calls go through the `Send + Sync` `DocumentService` trait
//!
//! # Error Handling
//!
//! - `shared::Result<T>` for fallible operations
//! - `OfflineError` distinguishes transient, storage and user-facing failures
//! - Best-effort paths log through `tracing` and never propagate
/// Shared types and data structures
pub mod shared;

/// Offline engine
pub mod client;
