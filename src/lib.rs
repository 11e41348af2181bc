// src/lib.rs
// Public library surface for the service binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod search;
pub mod store;

pub use crate::api::{create_router, AppState};

use std::sync::Arc;

use crate::config::AppConfig;
use crate::ingest::{rss::RssFeedReader, IngestCoordinator};
use crate::pipeline::BatchExtractor;
use crate::store::MemoryStore;

/// Wire stores, provider, search and ingestion into the router state.
pub fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let store = MemoryStore::new();
    let articles: Arc<dyn store::ArticleStore> = Arc::new(store.clone());
    let insights: Arc<dyn store::InsightStore> = Arc::new(store.clone());
    let sources: Arc<dyn store::SourceConfigStore> = Arc::new(store);

    let extractor = extract::build_extractor(&cfg.provider)?;
    let search = search::build_search(&cfg.search)?;
    tracing::info!(
        provider = extractor.name(),
        batch_size = cfg.pipeline.batch_size,
        batch_delay_ms = cfg.pipeline.batch_delay.as_millis() as u64,
        "pipeline configured"
    );

    let batch = Arc::new(BatchExtractor::new(
        extractor,
        insights.clone(),
        articles.clone(),
        search.clone(),
        cfg.pipeline.clone(),
    ));
    let ingest = Arc::new(IngestCoordinator::new(
        sources.clone(),
        articles.clone(),
        Arc::new(RssFeedReader::new()?),
        batch,
    ));

    Ok(AppState {
        articles,
        insights,
        sources,
        search,
        ingest,
        page_size: cfg.default_page_size,
    })
}
