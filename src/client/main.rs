/**
 * reader_sync - Offline Reader command line entry point
 *
 * Drives the offline engine from a shell: pin and unpin documents, inspect
 * their offline state, flush the pending queues and prune unpinned copies.
 * Configuration comes from READER_CONFIG, READER_API_URL, READER_DATA_DIR and
 * READER_TOKEN.
 */
use std::process::ExitCode;
use std::sync::Arc;

use offline_reader::client::offline::{
    MaxUploadSize, OfflineStores, Reconciler, Unlimited, UploadPolicy,
};
use offline_reader::client::sync::{Connectivity, OfflineSyncCoordinator, WatchNetworkMonitor};
use offline_reader::client::{Config, DocumentService, HttpDocumentService};

const USAGE: &str = "usage: reader_sync <pin <id> | unpin <id> | status [id] | flush | prune>";

enum Command {
    Pin(String),
    Unpin(String),
    Status(Option<String>),
    Flush,
    Prune,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Command> {
    let command = match (args.next()?.as_str(), args.next()) {
        ("pin", Some(id)) => Command::Pin(id),
        ("unpin", Some(id)) => Command::Unpin(id),
        ("status", id) => Command::Status(id),
        ("flush", None) => Command::Flush,
        ("prune", None) => Command::Prune,
        _ => return None,
    };
    args.next().is_none().then_some(command)
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "offline_reader=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = parse_args(std::env::args().skip(1)) else {
        eprintln!("{}", USAGE);
        return ExitCode::from(2);
    };

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    config.set_token(std::env::var("READER_TOKEN").ok());

    let stores = OfflineStores::open(&config);
    let service: Arc<dyn DocumentService> =
        Arc::new(HttpDocumentService::from_config(config.clone()));
    // The host platform's reachability API is not available from a shell
    let network = Arc::new(WatchNetworkMonitor::new(Connectivity::Unmetered));

    let coordinator = OfflineSyncCoordinator::builder(
        Arc::clone(&service),
        network.clone(),
        stores.pages.clone(),
    )
    .settings(config.sync_settings())
    .pin_file(config.pinned_documents_path())
    .build();

    match command {
        Command::Pin(id) => match coordinator.enable(&id) {
            Ok(outcome) => {
                tracing::debug!(?outcome, "Pin requested");
                coordinator.join(&id).await;
                let state = coordinator.state(&id);
                println!("{}: {}", id, state);
                if state.message().is_some() {
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                eprintln!("Cannot pin {}: {}", id, e);
                return ExitCode::FAILURE;
            }
        },
        Command::Unpin(id) => {
            if let Err(e) = coordinator.disable(&id) {
                eprintln!("Unpinned {}, but its offline copy could not be deleted: {}", id, e);
                return ExitCode::FAILURE;
            }
            println!("{}: unpinned", id);
        }
        Command::Status(Some(id)) => {
            let pinned = if coordinator.is_pinned(&id) { "pinned" } else { "not pinned" };
            println!("{}: {}, {}", id, pinned, coordinator.state(&id));
        }
        Command::Status(None) => {
            for id in coordinator.pinned_documents() {
                println!("{}: {}", id, coordinator.state(&id));
            }
            let positions = stores.positions.count().await.unwrap_or(0);
            let uploads = stores.uploads.count().await.unwrap_or(0);
            println!("pending positions: {}, pending uploads: {}", positions, uploads);
        }
        Command::Flush => {
            let policy: Arc<dyn UploadPolicy> = match config.max_upload_bytes() {
                Some(limit) => Arc::new(MaxUploadSize(limit)),
                None => Arc::new(Unlimited),
            };
            let reconciler = Reconciler::new(
                service,
                stores.positions.clone(),
                stores.uploads.clone(),
                network,
            )
            .with_policy(policy);

            let (uploads, positions) = reconciler.on_connectivity_restored().await;
            println!(
                "uploads: {} sent, {} left; positions: {} sent, {} left",
                uploads.succeeded, uploads.remaining, positions.succeeded, positions.remaining
            );
            if !uploads.is_complete() || !positions.is_complete() {
                return ExitCode::FAILURE;
            }
        }
        Command::Prune => {
            let removed = coordinator.prune_unpinned();
            println!("removed {} offline copies", removed);
        }
    }

    ExitCode::SUCCESS
}
