// src/store/mod.rs
//! Persistence seams. The pipeline only sees these traits; `memory` holds the
//! in-process backend used by the service and tests.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{
    Article, ArticleId, ArticleInsight, InsightStatus, NewArticle, NewSourceConfiguration,
    SourceConfiguration,
};

pub use memory::MemoryStore;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Rejects a second article with the same `source_url` with `Conflict`.
    async fn create(&self, article: NewArticle) -> Result<Article, StoreError>;
    async fn find_by_id(&self, id: ArticleId) -> Result<Option<Article>, StoreError>;
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Article>, StoreError>;
    /// All articles in creation order.
    async fn list(&self) -> Result<Vec<Article>, StoreError>;
    async fn list_unprocessed(&self) -> Result<Vec<Article>, StoreError>;
    /// `NotFound` when the article does not exist.
    async fn set_processed(&self, id: ArticleId, processed: bool) -> Result<(), StoreError>;
    /// Removes the article and its insight. Returns the removed article.
    async fn delete(&self, uuid: Uuid) -> Result<Option<Article>, StoreError>;
}

#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Upsert keyed by `article_id`: the latest save replaces the previous
    /// insight and keeps its row id.
    async fn save(&self, insight: ArticleInsight) -> Result<ArticleInsight, StoreError>;
    async fn find_by_article(
        &self,
        article_id: ArticleId,
    ) -> Result<Option<ArticleInsight>, StoreError>;
    async fn find_by_status(&self, status: InsightStatus)
        -> Result<Vec<ArticleInsight>, StoreError>;
    async fn list(&self) -> Result<Vec<ArticleInsight>, StoreError>;
}

#[async_trait]
pub trait SourceConfigStore: Send + Sync {
    async fn create(&self, cfg: NewSourceConfiguration)
        -> Result<SourceConfiguration, StoreError>;
    async fn list(&self) -> Result<Vec<SourceConfiguration>, StoreError>;
    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<SourceConfiguration>, StoreError>;
    async fn update(
        &self,
        uuid: Uuid,
        cfg: NewSourceConfiguration,
    ) -> Result<SourceConfiguration, StoreError>;
    async fn delete(&self, uuid: Uuid) -> Result<Option<SourceConfiguration>, StoreError>;
}
