// src/ingest/mod.rs
//! Ingestion: source configuration → feeds → articles → enrichment.

pub mod config;
pub mod rss;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PipelineError, StoreError};
use crate::ingest::types::{FeedItem, FeedReader};
use crate::model::{ArticleInsight, NewArticle, NewSourceConfiguration, SourceConfiguration};
use crate::pipeline::BatchExtractor;
use crate::store::{ArticleStore, SourceConfigStore};

/// Clean feed text: decode entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("static regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Article fields for a feed item. Items without a title fall back to their
/// link; items with neither are dropped.
pub fn article_from_item(item: FeedItem) -> Option<NewArticle> {
    let source_url = item.source_url.trim().to_string();
    let mut title = clean_text(&item.title);
    if title.is_empty() {
        title = source_url.clone();
    }
    if title.is_empty() {
        return None;
    }
    let description = clean_text(&item.description);
    Some(NewArticle {
        title,
        description: (!description.is_empty()).then_some(description),
        publication_date: (!item.pub_date.is_empty()).then_some(item.pub_date),
        source_url: (!source_url.is_empty()).then_some(source_url),
    })
}

pub struct IngestCoordinator {
    sources: Arc<dyn SourceConfigStore>,
    articles: Arc<dyn ArticleStore>,
    feeds: Arc<dyn FeedReader>,
    extractor: Arc<BatchExtractor>,
}

impl IngestCoordinator {
    pub fn new(
        sources: Arc<dyn SourceConfigStore>,
        articles: Arc<dyn ArticleStore>,
        feeds: Arc<dyn FeedReader>,
        extractor: Arc<BatchExtractor>,
    ) -> Self {
        Self {
            sources,
            articles,
            feeds,
            extractor,
        }
    }

    pub fn extractor(&self) -> &Arc<BatchExtractor> {
        &self.extractor
    }

    pub fn sources(&self) -> &Arc<dyn SourceConfigStore> {
        &self.sources
    }

    /// Store seed configurations whose name is not taken yet. Returns how many
    /// were created.
    pub async fn seed_sources(
        &self,
        seeds: Vec<NewSourceConfiguration>,
    ) -> Result<usize, StoreError> {
        let existing = self.sources.list().await?;
        let mut created = 0usize;
        for seed in seeds {
            if existing.iter().any(|c| c.name == seed.name) {
                continue;
            }
            self.sources.create(seed).await?;
            created += 1;
        }
        Ok(created)
    }

    /// Pull every feed of the configuration into the article store, then run
    /// the whole article set through the enrichment pipeline.
    pub async fn fetch(
        &self,
        source_configuration_uuid: Uuid,
    ) -> Result<Vec<ArticleInsight>, PipelineError> {
        let cfg = self
            .sources
            .find_by_uuid(source_configuration_uuid)
            .await?
            .ok_or(PipelineError::ConfigurationNotFound(source_configuration_uuid))?;

        let created = self.ingest_sources(&cfg).await?;
        info!(source = %cfg.name, created, "feeds ingested");

        let articles = self.articles.list().await?;
        self.extractor.process_articles(&articles).await
    }

    async fn ingest_sources(&self, cfg: &SourceConfiguration) -> Result<usize, PipelineError> {
        let mut created = 0usize;
        for url in &cfg.sources {
            for item in self.feeds.parse_feed(url).await {
                let Some(new_article) = article_from_item(item) else {
                    continue;
                };
                match self.articles.create(new_article).await {
                    Ok(_) => created += 1,
                    Err(StoreError::Conflict(msg)) => warn!(url = %url, "skipping article: {msg}"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        counter!("ingest_articles_created_total").increment(created as u64);
        Ok(created)
    }

    /// Run all articles that never went through the pipeline.
    pub async fn process_unprocessed(&self) -> Result<Vec<ArticleInsight>, PipelineError> {
        let articles = self.articles.list_unprocessed().await?;
        if articles.is_empty() {
            info!("No unprocessed articles found");
            return Ok(Vec::new());
        }
        self.extractor.process_articles(&articles).await
    }

    /// Re-submit every stored article whose insight is `failed`.
    pub async fn retry_failed(&self) -> Result<Vec<ArticleInsight>, PipelineError> {
        let articles = self.articles.list().await?;
        self.extractor.retry_failed_articles(&articles).await
    }
}
