// src/store/memory.rs
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ArticleStore, InsightStore, SourceConfigStore};
use crate::error::StoreError;
use crate::model::{
    Article, ArticleId, ArticleInsight, InsightStatus, NewArticle, NewSourceConfiguration,
    SourceConfiguration,
};

#[derive(Debug, Default)]
struct Tables {
    articles: BTreeMap<ArticleId, Article>,
    // keyed by article id: one insight per article
    insights: BTreeMap<ArticleId, ArticleInsight>,
    sources: BTreeMap<u64, SourceConfiguration>,
    next_article_id: u64,
    next_insight_id: u64,
    next_source_id: u64,
}

/// All three stores over one lock, so deleting an article can cascade to its
/// insight atomically.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn create(&self, article: NewArticle) -> Result<Article, StoreError> {
        let mut t = self.inner.write().await;
        if let Some(url) = article.source_url.as_deref().filter(|u| !u.is_empty()) {
            if t
                .articles
                .values()
                .any(|a| a.source_url.as_deref() == Some(url))
            {
                return Err(StoreError::Conflict(format!(
                    "article with source url {url} already exists"
                )));
            }
        }
        t.next_article_id += 1;
        let created = Article {
            id: t.next_article_id,
            uuid: Uuid::new_v4(),
            title: article.title,
            description: article.description,
            publication_date: article.publication_date,
            source_url: article.source_url,
            is_processed: false,
            created_at: Utc::now(),
        };
        t.articles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: ArticleId) -> Result<Option<Article>, StoreError> {
        Ok(self.inner.read().await.articles.get(&id).cloned())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Article>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.articles.values().find(|a| a.uuid == uuid).cloned())
    }

    async fn list(&self) -> Result<Vec<Article>, StoreError> {
        Ok(self.inner.read().await.articles.values().cloned().collect())
    }

    async fn list_unprocessed(&self) -> Result<Vec<Article>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.articles
            .values()
            .filter(|a| !a.is_processed)
            .cloned()
            .collect())
    }

    async fn set_processed(&self, id: ArticleId, processed: bool) -> Result<(), StoreError> {
        let mut t = self.inner.write().await;
        let article = t
            .articles
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("article", id))?;
        article.is_processed = processed;
        Ok(())
    }

    async fn delete(&self, uuid: Uuid) -> Result<Option<Article>, StoreError> {
        let mut t = self.inner.write().await;
        let Some(id) = t.articles.values().find(|a| a.uuid == uuid).map(|a| a.id) else {
            return Ok(None);
        };
        t.insights.remove(&id);
        Ok(t.articles.remove(&id))
    }
}

#[async_trait]
impl InsightStore for MemoryStore {
    async fn save(&self, mut insight: ArticleInsight) -> Result<ArticleInsight, StoreError> {
        let mut t = self.inner.write().await;
        if !t.articles.contains_key(&insight.article_id) {
            return Err(StoreError::not_found("article", insight.article_id));
        }
        match t.insights.get(&insight.article_id) {
            Some(prev) => {
                insight.id = prev.id;
                insight.uuid = prev.uuid;
            }
            None => {
                t.next_insight_id += 1;
                insight.id = Some(t.next_insight_id);
            }
        }
        t.insights.insert(insight.article_id, insight.clone());
        Ok(insight)
    }

    async fn find_by_article(
        &self,
        article_id: ArticleId,
    ) -> Result<Option<ArticleInsight>, StoreError> {
        Ok(self.inner.read().await.insights.get(&article_id).cloned())
    }

    async fn find_by_status(
        &self,
        status: InsightStatus,
    ) -> Result<Vec<ArticleInsight>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.insights
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<ArticleInsight>, StoreError> {
        Ok(self.inner.read().await.insights.values().cloned().collect())
    }
}

#[async_trait]
impl SourceConfigStore for MemoryStore {
    async fn create(
        &self,
        cfg: NewSourceConfiguration,
    ) -> Result<SourceConfiguration, StoreError> {
        let mut t = self.inner.write().await;
        t.next_source_id += 1;
        let created = SourceConfiguration {
            id: t.next_source_id,
            uuid: Uuid::new_v4(),
            name: cfg.name,
            sources: cfg.sources,
            created_at: Utc::now(),
        };
        t.sources.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<SourceConfiguration>, StoreError> {
        Ok(self.inner.read().await.sources.values().cloned().collect())
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<SourceConfiguration>, StoreError> {
        let t = self.inner.read().await;
        Ok(t.sources.values().find(|s| s.uuid == uuid).cloned())
    }

    async fn update(
        &self,
        uuid: Uuid,
        cfg: NewSourceConfiguration,
    ) -> Result<SourceConfiguration, StoreError> {
        let mut t = self.inner.write().await;
        let existing = t
            .sources
            .values_mut()
            .find(|s| s.uuid == uuid)
            .ok_or_else(|| StoreError::not_found("source configuration", uuid))?;
        existing.name = cfg.name;
        existing.sources = cfg.sources;
        Ok(existing.clone())
    }

    async fn delete(&self, uuid: Uuid) -> Result<Option<SourceConfiguration>, StoreError> {
        let mut t = self.inner.write().await;
        let Some(id) = t.sources.values().find(|s| s.uuid == uuid).map(|s| s.id) else {
            return Ok(None);
        };
        Ok(t.sources.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_article(url: &str) -> NewArticle {
        NewArticle {
            title: "Title".into(),
            description: Some("Body".into()),
            publication_date: None,
            source_url: Some(url.into()),
        }
    }

    #[tokio::test]
    async fn duplicate_source_url_conflicts() {
        let store = MemoryStore::new();
        ArticleStore::create(&store, new_article("https://a.test/1"))
            .await
            .unwrap();
        let dup = ArticleStore::create(&store, new_article("https://a.test/1")).await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn insight_save_overwrites_and_keeps_identity() {
        let store = MemoryStore::new();
        let a = ArticleStore::create(&store, new_article("https://a.test/1"))
            .await
            .unwrap();

        let first = store.save(ArticleInsight::failed(a.id)).await.unwrap();
        let mut retry = ArticleInsight::failed(a.id);
        retry.status = InsightStatus::Success;
        let second = store.save(retry).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.uuid, second.uuid);
        assert_eq!(InsightStore::list(&store).await.unwrap().len(), 1);
        assert!(store
            .find_by_status(InsightStatus::Failed)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn insight_for_unknown_article_is_rejected() {
        let store = MemoryStore::new();
        let res = store.save(ArticleInsight::failed(42)).await;
        assert!(matches!(res, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn deleting_article_cascades_to_insight() {
        let store = MemoryStore::new();
        let a = ArticleStore::create(&store, new_article("https://a.test/1"))
            .await
            .unwrap();
        store.save(ArticleInsight::failed(a.id)).await.unwrap();

        let removed = ArticleStore::delete(&store, a.uuid).await.unwrap();
        assert_eq!(removed.map(|r| r.id), Some(a.id));
        assert!(store.find_by_article(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_processed_on_missing_article_fails() {
        let store = MemoryStore::new();
        assert!(store.set_processed(9, true).await.is_err());
    }
}
