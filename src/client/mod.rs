//! Client Engine Module
//!
//! Everything that runs on the reading device: the remote service client,
//! page assembly, offline storage, background downloads and reconciliation.
//!
//! # Architecture
//!
//! - **`config`** - Configuration management (server URL, token, data layout)
//! - **`api`** - Remote document service trait and HTTP client
//! - **`pagination`** - Content blocks to page strings
//! - **`offline`** - Page store, pending queues, index, reconciliation
//! - **`sync`** - Offline sync coordinator and network monitor
//! - **`reader`** - Opening a document from cache or live
//! - **`library`** - Offline-first listing with optimistic favorites
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - reader_sync command line entry point
//! ├── config.rs       - Configuration management
//! ├── api.rs          - DocumentService and HttpDocumentService
//! ├── pagination.rs   - Page assembler
//! ├── reader.rs       - DocumentReader
//! ├── library.rs      - DocumentLibrary
//! ├── offline/        - Durable local state
//! └── sync/           - Background download coordination
//! ```

pub mod api;
pub mod config;
pub mod library;
pub mod offline;
pub mod pagination;
pub mod reader;
pub mod sync;

// Re-export commonly used types
pub use api::{DocumentService, HttpDocumentService, StaticToken, TokenProvider};
pub use config::Config;
pub use library::DocumentLibrary;
pub use offline::{OfflinePageStore, OfflineStores, Reconciler};
pub use pagination::{assemble_pages, paginate_with_fallback, Paginator};
pub use reader::{DocumentReader, OpenedDocument, PageSource};
pub use sync::{DownloadState, EnableOutcome, OfflineSyncCoordinator, SyncSettings};
