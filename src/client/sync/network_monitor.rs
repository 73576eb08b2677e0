//! # Network Monitor
//!
//! Connectivity as seen by the offline engine.
//!
//! ## Features
//!
//! - **Connectivity Detection**: offline, metered or unmetered
//! - **Adaptive Sync**: downloads may require an unmetered link
//! - **Real-time Updates**: changes are published on a `watch` channel
//!
//! The host application owns the platform reachability API and feeds it into
//! a [`WatchNetworkMonitor`]; everything else only sees the [`NetworkMonitor`]
//! trait.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::offline::Reconciler;
use crate::client::sync::OfflineSyncCoordinator;

/// Link quality relevant to downloading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Offline,
    /// Online over a connection the user pays for (cellular, hotspot)
    Metered,
    /// Online over Wi-Fi or ethernet
    Unmetered,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        !matches!(self, Connectivity::Offline)
    }

    /// Whether background downloads may start
    pub fn allows_download(self, require_unmetered: bool) -> bool {
        match self {
            Connectivity::Offline => false,
            Connectivity::Metered => !require_unmetered,
            Connectivity::Unmetered => true,
        }
    }
}

/// Source of connectivity information
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity
    fn status(&self) -> Connectivity;

    /// Receiver notified on every change
    fn subscribe(&self) -> watch::Receiver<Connectivity>;
}

/// Settable monitor backed by a `watch` channel
#[derive(Debug)]
pub struct WatchNetworkMonitor {
    tx: watch::Sender<Connectivity>,
}

impl WatchNetworkMonitor {
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Publish a new status; unchanged values do not wake subscribers
    pub fn set(&self, status: Connectivity) {
        self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            tracing::info!(from = ?*current, to = ?status, "Connectivity changed");
            *current = status;
            true
        });
    }
}

impl Default for WatchNetworkMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Offline)
    }
}

impl NetworkMonitor for WatchNetworkMonitor {
    fn status(&self) -> Connectivity {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }
}

/// React to connectivity changes until the monitor goes away
///
/// Coming online flushes both pending queues. Gaining a connection that
/// allows downloads resumes pinned documents that were waiting.
pub fn spawn_connectivity_listener(
    monitor: Arc<dyn NetworkMonitor>,
    reconciler: Arc<Reconciler>,
    coordinator: OfflineSyncCoordinator,
) -> JoinHandle<()> {
    let mut rx = monitor.subscribe();
    let mut previous = *rx.borrow_and_update();
    tokio::spawn(async move {
        let require_unmetered = coordinator.settings().require_unmetered;

        while rx.changed().await.is_ok() {
            let current = *rx.borrow_and_update();

            if current.is_online() && !previous.is_online() {
                let (uploads, positions) = reconciler.on_connectivity_restored().await;
                tracing::info!(
                    uploads_sent = uploads.succeeded,
                    uploads_left = uploads.remaining,
                    positions_sent = positions.succeeded,
                    positions_left = positions.remaining,
                    "Flushed pending queues after reconnect"
                );
            }

            if current.allows_download(require_unmetered)
                && !previous.allows_download(require_unmetered)
            {
                let resumed = coordinator.resume_pinned();
                if resumed > 0 {
                    tracing::info!(resumed, "Resumed pinned downloads");
                }
            }

            previous = current;
        }
        tracing::debug!("Connectivity listener stopped");
    })
}
