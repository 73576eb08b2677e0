//! Pending queue reconciliation flows

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use offline_reader::client::offline::{FlushOutcome, MaxUploadSize, OfflineStores};
use offline_reader::client::sync::{
    spawn_connectivity_listener, Connectivity, DownloadState, EnableOutcome,
};
use offline_reader::shared::{ProcessingStatus, ReadingPosition};

use crate::common::{fast_settings, job, JobStep, TestEnv};
use crate::{assert_contains, assert_ok, assert_settles};

async fn enqueue_uploads(env: &TestEnv, count: usize) -> Vec<String> {
    let mut names = Vec::new();
    for i in 1..=count {
        let name = format!("scan-{}.pdf", i);
        assert_ok!(env.stores.uploads.enqueue_bytes(vec![i as u8; 16], &name).await);
        names.push(name);
        // Keep creation times strictly ordered
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    names
}

#[tokio::test]
async fn test_upload_flush_stops_at_first_failure() {
    let env = TestEnv::new(Connectivity::Unmetered);
    let names = enqueue_uploads(&env, 5).await;
    env.service.fail_uploads_after(2);

    let report = env.reconciler().flush_uploads().await;

    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.remaining, 3);
    assert!(!report.is_complete());
    assert_eq!(env.service.uploaded_names(), names[..2].to_vec());

    let left: Vec<String> = env
        .stores
        .uploads
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.file_name)
        .collect();
    assert_eq!(left, names[2..].to_vec());
}

#[tokio::test]
async fn test_upload_queue_survives_restart() {
    let env = TestEnv::new(Connectivity::Offline);
    let names = enqueue_uploads(&env, 2).await;

    let report = env.reconciler().flush_uploads().await;
    assert_eq!(
        report.outcome,
        FlushOutcome::Stopped {
            reason: "offline".to_string()
        }
    );
    assert_eq!(report.remaining, 2);

    // Same data directory, fresh stores
    let reopened = OfflineStores::open(&env.config);
    env.network.set(Connectivity::Metered);
    let reconciler = offline_reader::client::Reconciler::new(
        env.service.clone(),
        reopened.positions.clone(),
        reopened.uploads.clone(),
        env.network.clone(),
    );
    let report = reconciler.flush_uploads().await;

    assert!(report.is_complete());
    assert_eq!(env.service.uploaded_names(), names);
    assert_eq!(reopened.uploads.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_upload_stays_queued() {
    let env = TestEnv::new(Connectivity::Unmetered);
    assert_ok!(env.stores.uploads.enqueue_bytes(vec![0; 64], "big.pdf").await);

    let reconciler = env.reconciler().with_policy(Arc::new(MaxUploadSize(32)));
    let report = reconciler.flush_uploads().await;

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.remaining, 1);
    match report.outcome {
        FlushOutcome::Stopped { reason } => assert_contains!(reason, "quota"),
        other => panic!("Expected Stopped, got {:?}", other),
    }
    assert!(env.service.uploaded_names().is_empty());
}

#[tokio::test]
async fn test_offline_positions_are_last_write_wins() {
    let env = TestEnv::new(Connectivity::Offline);
    let reconciler = env.reconciler();

    reconciler.record_position("doc-1", 3, 0.1).await.unwrap();
    reconciler.record_position("doc-1", 9, 0.45).await.unwrap();
    reconciler.record_position("doc-2", 1, 0.0).await.unwrap();
    assert_eq!(env.stores.positions.count().await.unwrap(), 2);

    let resolved = reconciler.resolve_position("doc-1").await.unwrap().unwrap();
    assert_eq!(resolved.page_number, 9);

    env.network.set(Connectivity::Metered);
    let report = reconciler.flush_positions().await;

    assert!(report.is_complete());
    assert_eq!(report.succeeded, 2);
    assert_eq!(env.service.remote_position("doc-1").unwrap().page_number, 9);
    assert_eq!(env.stores.positions.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_failed_position_push_is_retried_later() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.service.fail_positions(true);
    let reconciler = env.reconciler();

    reconciler.record_position("doc-1", 4, 0.2).await.unwrap();
    assert_eq!(env.stores.positions.count().await.unwrap(), 1);
    assert!(env.service.remote_position("doc-1").is_none());

    let report = reconciler.flush_positions().await;
    assert_eq!(report.remaining, 1);
    assert!(!report.is_complete());

    env.service.fail_positions(false);
    let report = reconciler.flush_positions().await;
    assert!(report.is_complete());
    assert_eq!(env.service.remote_position("doc-1").unwrap().page_number, 4);
}

#[tokio::test]
async fn test_resolve_prefers_pending_over_remote() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.service.set_remote_position(ReadingPosition {
        document_id: "doc-1".to_string(),
        page_number: 2,
        progress: 0.05,
    });
    let reconciler = env.reconciler();

    let remote = reconciler.resolve_position("doc-1").await.unwrap().unwrap();
    assert_eq!(remote.page_number, 2);

    env.network.set(Connectivity::Offline);
    reconciler.record_position("doc-1", 30, 0.6).await.unwrap();
    let local = reconciler.resolve_position("doc-1").await.unwrap().unwrap();
    assert_eq!(local.page_number, 30);

    assert!(reconciler.resolve_position("doc-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reconnect_flushes_queues_and_resumes_downloads() {
    let env = TestEnv::new(Connectivity::Offline);
    env.service.script_jobs(
        "doc-1",
        vec![JobStep::Respond(job("doc-1", ProcessingStatus::Ready, 2, 2))],
    );
    let coordinator = env.coordinator(fast_settings());
    let reconciler = Arc::new(env.reconciler());

    assert_eq!(
        coordinator.enable("doc-1").unwrap(),
        EnableOutcome::WaitingForNetwork
    );
    reconciler.record_position("doc-1", 7, 0.3).await.unwrap();
    enqueue_uploads(&env, 1).await;

    let listener = spawn_connectivity_listener(
        env.network.clone(),
        reconciler.clone(),
        coordinator.clone(),
    );
    let mut state = coordinator.subscribe("doc-1");
    env.network.set(Connectivity::Unmetered);

    assert_settles!(state, DownloadState::Available);
    for _ in 0..200 {
        if env.stores.positions.count().await.unwrap() == 0
            && env.stores.uploads.count().await.unwrap() == 0
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(env.service.remote_position("doc-1").unwrap().page_number, 7);
    assert_eq!(env.service.uploaded_names(), vec!["scan-1.pdf".to_string()]);

    listener.abort();
}

#[tokio::test]
async fn test_unreadable_upload_payload_stops_flush() {
    let env = TestEnv::new(Connectivity::Unmetered);
    let entry = env
        .stores
        .uploads
        .enqueue_bytes(b"%PDF".to_vec(), "gone.pdf")
        .await
        .unwrap();
    std::fs::remove_file(env.stores.uploads.dir().join(format!("{}.bin", entry.id))).unwrap();

    let report = env.reconciler().flush_uploads().await;

    assert_eq!(report.attempted, 1);
    assert_eq!(report.remaining, 1);
    assert!(matches!(report.outcome, FlushOutcome::Stopped { .. }));
}
