//! Offline-first document listing

use pretty_assertions::assert_eq;

use offline_reader::client::sync::Connectivity;
use offline_reader::client::DocumentLibrary;
use offline_reader::shared::{DocumentSummary, ProcessingStatus};

use crate::common::TestEnv;

fn summary(id: &str, title: &str) -> DocumentSummary {
    DocumentSummary {
        id: id.to_string(),
        title: title.to_string(),
        author: None,
        page_count: Some(12),
        optimized_page_count: None,
        is_favorite: false,
        processing_status: ProcessingStatus::Ready,
    }
}

#[tokio::test]
async fn test_listing_is_available_after_restart() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.service
        .set_listing(vec![summary("a", "Alpha"), summary("b", "Beta")]);

    let library = DocumentLibrary::new(env.service.clone(), env.stores.index.clone());
    assert!(library.load_cached().await.is_empty());
    library.refresh().await.unwrap();

    let relaunched = DocumentLibrary::new(env.service.clone(), env.stores.index.clone());
    let cached = relaunched.load_cached().await;
    assert_eq!(
        cached.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
}

#[tokio::test]
async fn test_refresh_replaces_listing_wholesale() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.service
        .set_listing(vec![summary("a", "Alpha"), summary("b", "Beta")]);
    let library = DocumentLibrary::new(env.service.clone(), env.stores.index.clone());
    library.refresh().await.unwrap();

    env.service.set_listing(vec![summary("c", "Gamma")]);
    library.refresh().await.unwrap();

    let snapshot = env.stores.index.load().await.unwrap();
    assert_eq!(snapshot.documents, vec![summary("c", "Gamma")]);
    assert_eq!(library.documents().await, vec![summary("c", "Gamma")]);
}

#[tokio::test]
async fn test_favorite_reaches_index_on_next_refresh() {
    let env = TestEnv::new(Connectivity::Unmetered);
    env.service.set_listing(vec![summary("a", "Alpha")]);
    let library = DocumentLibrary::new(env.service.clone(), env.stores.index.clone());
    library.refresh().await.unwrap();

    assert!(library.toggle_favorite("a").await.unwrap());
    assert!(!env.stores.index.load().await.unwrap().documents[0].is_favorite);

    library.refresh().await.unwrap();
    assert!(env.stores.index.load().await.unwrap().documents[0].is_favorite);
}
