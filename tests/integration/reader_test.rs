//! Opening documents from the cache or the live service

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use offline_reader::client::sync::Connectivity;
use offline_reader::client::PageSource;
use offline_reader::shared::{ContentBlock, OfflineError, ProcessingStatus};

use crate::common::{fast_settings, job, pages, JobStep, TestEnv};
use crate::{assert_err, assert_ok};

fn blocks() -> Vec<ContentBlock> {
    vec![
        ContentBlock::new("paragraph", "Body of page two", 2, 0),
        ContentBlock::new("heading", "Intro", 1, 0),
        ContentBlock::new("paragraph", "Opening words", 1, 1),
    ]
}

#[tokio::test]
async fn test_pinned_document_opens_offline() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.service.script_jobs(
        "doc-1",
        vec![JobStep::Respond(job("doc-1", ProcessingStatus::Ready, 4, 4))],
    );
    let coordinator = env.coordinator(fast_settings());
    coordinator.enable("doc-1").unwrap();
    coordinator.join("doc-1").await;

    env.network.set(Connectivity::Offline);
    let opened = assert_ok!(env.reader().open_pages("doc-1", Some("doc-1-v3")).await);

    assert_eq!(opened.source, PageSource::Offline);
    assert_eq!(opened.pages, pages(4));
}

#[tokio::test]
async fn test_stale_copy_is_bypassed_when_online() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.stores
        .pages
        .save("doc-1", &pages(3), 2, Some("doc-1-v2"), true)
        .unwrap();
    env.service.set_blocks("doc-1", blocks());

    let opened = env.reader().open_pages("doc-1", Some("doc-1-v3")).await.unwrap();

    assert_eq!(opened.source, PageSource::Live);
    assert_eq!(
        opened.pages,
        vec![
            "INTRO\n\nOpening words".to_string(),
            "Body of page two".to_string()
        ]
    );
}

#[tokio::test]
async fn test_partial_copy_is_not_served_as_offline() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.stores
        .pages
        .save("doc-1", &pages(3), 1, None, false)
        .unwrap();
    env.service.set_blocks("doc-1", blocks());

    let opened = env.reader().open_pages("doc-1", None).await.unwrap();
    assert_eq!(opened.source, PageSource::Live);
    assert_eq!(opened.pages.len(), 2);

    env.network.set(Connectivity::Offline);
    let result = env.reader().open_pages("doc-1", None).await;
    assert_matches!(result, Err(OfflineError::OfflineUnavailable { .. }));
}

#[tokio::test]
async fn test_missing_copy_offline_is_reported() {
    let env = TestEnv::new(Connectivity::Offline);
    env.service.set_blocks("doc-1", blocks());

    let result = env.reader().open_pages("doc-1", None).await;

    assert_matches!(
        result,
        Err(OfflineError::OfflineUnavailable { ref document_id }) if document_id == "doc-1"
    );
}

#[tokio::test]
async fn test_unnumbered_blocks_use_fallback_paginator() {
    let env = TestEnv::new(Connectivity::Metered);
    env.service.set_blocks(
        "doc-1",
        vec![
            ContentBlock::new("paragraph", "First", 0, 0),
            ContentBlock::new("paragraph", "Second", 0, 1),
        ],
    );

    let opened = env.reader().open_pages("doc-1", None).await.unwrap();

    assert_eq!(opened.source, PageSource::Live);
    assert_eq!(opened.pages, vec!["First".to_string(), "Second".to_string()]);
}

#[tokio::test]
async fn test_unknown_document_propagates_service_error() {
    let env = TestEnv::new(Connectivity::Unmetered);

    assert_err!(
        env.reader().open_pages("missing", None).await,
        OfflineError::Remote { status: 404, .. }
    );
}
