// tests/search_rebuild.rs
mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{orchestrator, seed_articles, RecordingSearch, ScriptedExtractor};
use feed_insights::search::{rebuild_index, ArticleDocument, NoopSearch};
use feed_insights::store::MemoryStore;

#[tokio::test]
async fn rebuild_pushes_only_successful_insights() {
    let store = MemoryStore::new();
    let articles = seed_articles(&store, 4).await;
    let pipeline = orchestrator(
        Arc::new(ScriptedExtractor::failing_on(&["a2"])),
        Arc::new(store.clone()),
        &store,
        Arc::new(NoopSearch),
        5,
    );
    pipeline.process_articles(&articles).await.unwrap();

    let search = RecordingSearch::default();
    let pushed = rebuild_index(&search, &store, &store).await.unwrap();

    assert_eq!(pushed, 3);
    assert_eq!(search.cleared.load(Ordering::SeqCst), 1);
    let mut ids = search.doc_ids();
    ids.sort_unstable();
    assert_eq!(ids, vec![articles[0].id, articles[2].id, articles[3].id]);

    let docs = search.docs.lock().unwrap().clone();
    let first: &ArticleDocument = docs.iter().find(|d| d.id == articles[0].id).unwrap();
    assert_eq!(first.title, "a1");
    assert_eq!(first.source_url.as_deref(), Some("https://news.test/1"));
    assert_eq!(first.category.as_deref(), Some("Technology"));
}

#[tokio::test]
async fn rebuild_surfaces_search_errors() {
    let store = MemoryStore::new();
    let search = RecordingSearch::failing();
    assert!(rebuild_index(&search, &store, &store).await.is_err());
}

#[test]
fn documents_serialize_camel_case() {
    let doc = ArticleDocument {
        id: 9,
        title: "t".into(),
        description: None,
        publication_date: Some("2025-01-01T00:00:00Z".into()),
        source_url: Some("https://x.test".into()),
        topics: Some("a".into()),
        keywords: None,
        people: None,
        organizations: None,
        locations: None,
        category: Some("Unknown".into()),
    };
    let v = serde_json::to_value(&doc).unwrap();
    assert_eq!(v["publicationDate"], "2025-01-01T00:00:00Z");
    assert_eq!(v["sourceUrl"], "https://x.test");
}
