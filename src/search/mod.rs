// src/search/mod.rs
//! Search index mirror of enriched articles.

pub mod meili;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::model::{Article, ArticleId, ArticleInsight};
use crate::store::{ArticleStore, InsightStore};

pub use meili::MeiliSearchSync;

/// Flattened article + insight, one document per article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDocument {
    pub id: ArticleId,
    pub title: String,
    pub description: Option<String>,
    pub publication_date: Option<String>,
    pub source_url: Option<String>,
    pub topics: Option<String>,
    pub keywords: Option<String>,
    pub people: Option<String>,
    pub organizations: Option<String>,
    pub locations: Option<String>,
    pub category: Option<String>,
}

impl ArticleDocument {
    pub fn from_parts(article: &Article, insight: &ArticleInsight) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            description: article.description.clone(),
            publication_date: article.publication_date.clone(),
            source_url: article.source_url.clone(),
            topics: insight.topics.clone(),
            keywords: insight.keywords.clone(),
            people: insight.people.clone(),
            organizations: insight.organizations.clone(),
            locations: insight.locations.clone(),
            category: insight.category.clone(),
        }
    }
}

#[async_trait]
pub trait SearchSync: Send + Sync {
    /// Prepare the index (searchable/filterable/sortable attributes).
    async fn init(&self) -> Result<()>;
    async fn add_documents(&self, docs: &[ArticleDocument]) -> Result<()>;
    async fn delete_document(&self, id: ArticleId) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

pub type DynSearch = Arc<dyn SearchSync>;

/// Used when no search backend is configured.
pub struct NoopSearch;

#[async_trait]
impl SearchSync for NoopSearch {
    async fn init(&self) -> Result<()> {
        Ok(())
    }
    async fn add_documents(&self, _docs: &[ArticleDocument]) -> Result<()> {
        Ok(())
    }
    async fn delete_document(&self, _id: ArticleId) -> Result<()> {
        Ok(())
    }
    async fn delete_all(&self) -> Result<()> {
        Ok(())
    }
}

pub fn build_search(cfg: &SearchConfig) -> Result<DynSearch> {
    match cfg.url.as_deref() {
        Some(url) => Ok(Arc::new(MeiliSearchSync::new(url, cfg.api_key.clone())?)),
        None => {
            tracing::debug!("search sync disabled (no MEILISEARCH_URL)");
            Ok(Arc::new(NoopSearch))
        }
    }
}

/// Clears the index and re-adds every successful insight with its article.
/// Returns the number of documents pushed.
pub async fn rebuild_index(
    search: &dyn SearchSync,
    articles: &dyn ArticleStore,
    insights: &dyn InsightStore,
) -> Result<usize> {
    search.delete_all().await.context("clearing search index")?;

    let mut docs = Vec::new();
    for insight in insights.list().await?.into_iter().filter(|i| i.is_success()) {
        match articles.find_by_id(insight.article_id).await? {
            Some(article) => docs.push(ArticleDocument::from_parts(&article, &insight)),
            None => tracing::warn!(article_id = insight.article_id, "insight without article"),
        }
    }
    if !docs.is_empty() {
        search
            .add_documents(&docs)
            .await
            .context("adding documents to search index")?;
    }
    tracing::info!(documents = docs.len(), "search index rebuilt");
    Ok(docs.len())
}
