// tests/common/mod.rs
//
// Shared test doubles for the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use feed_insights::config::PipelineConfig;
use feed_insights::error::{ExtractionError, StoreError};
use feed_insights::extract::Extractor;
use feed_insights::ingest::types::{FeedItem, FeedReader};
use feed_insights::model::{
    Article, ArticleId, ArticleInsight, ExtractedInsight, InsightStatus, NamedEntities, NewArticle,
};
use feed_insights::pipeline::BatchExtractor;
use feed_insights::search::{ArticleDocument, SearchSync};
use feed_insights::store::{ArticleStore, InsightStore, MemoryStore};

/// Succeeds for every title except those listed in `fail_titles`.
#[derive(Default)]
pub struct ScriptedExtractor {
    fail_titles: Mutex<HashSet<String>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn failing_on(titles: &[&str]) -> Self {
        let s = Self::default();
        s.set_failing(titles);
        s
    }

    pub fn set_failing(&self, titles: &[&str]) {
        let mut f = self.fail_titles.lock().unwrap();
        f.clear();
        f.extend(titles.iter().map(|t| t.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_titles(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn insight_for(title: &str) -> ExtractedInsight {
    ExtractedInsight {
        topics: format!("topic of {title}"),
        keywords: "alpha, beta".into(),
        named_entities: NamedEntities {
            people: "Ada".into(),
            organizations: "ACME".into(),
            locations: "Prague".into(),
        },
        category: "Technology".into(),
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, title: &str, _body: &str) -> Result<ExtractedInsight, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(title.to_string());
        if self.fail_titles.lock().unwrap().contains(title) {
            return Err(ExtractionError::EmptyResponse);
        }
        Ok(insight_for(title))
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Insight store whose first `failures` saves return `Unavailable`.
pub struct FlakyInsightStore {
    inner: MemoryStore,
    remaining_failures: AtomicUsize,
    pub save_calls: AtomicUsize,
}

impl FlakyInsightStore {
    pub fn new(inner: MemoryStore, failures: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(failures),
            save_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl InsightStore for FlakyInsightStore {
    async fn save(&self, insight: ArticleInsight) -> Result<ArticleInsight, StoreError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("database is down".into()));
        }
        self.inner.save(insight).await
    }
    async fn find_by_article(&self, id: ArticleId) -> Result<Option<ArticleInsight>, StoreError> {
        self.inner.find_by_article(id).await
    }
    async fn find_by_status(&self, s: InsightStatus) -> Result<Vec<ArticleInsight>, StoreError> {
        self.inner.find_by_status(s).await
    }
    async fn list(&self) -> Result<Vec<ArticleInsight>, StoreError> {
        InsightStore::list(&self.inner).await
    }
}

/// Saves for the listed article ids always fail; everything else passes through.
pub struct AlwaysFailingInsightStore {
    inner: MemoryStore,
    failing: HashSet<ArticleId>,
    pub save_calls: Mutex<HashMap<ArticleId, usize>>,
}

impl AlwaysFailingInsightStore {
    pub fn new(inner: MemoryStore, failing: impl IntoIterator<Item = ArticleId>) -> Self {
        Self {
            inner,
            failing: failing.into_iter().collect(),
            save_calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls_for(&self, id: ArticleId) -> usize {
        self.save_calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl InsightStore for AlwaysFailingInsightStore {
    async fn save(&self, insight: ArticleInsight) -> Result<ArticleInsight, StoreError> {
        *self
            .save_calls
            .lock()
            .unwrap()
            .entry(insight.article_id)
            .or_default() += 1;
        if self.failing.contains(&insight.article_id) {
            return Err(StoreError::Unavailable("write rejected".into()));
        }
        self.inner.save(insight).await
    }
    async fn find_by_article(&self, id: ArticleId) -> Result<Option<ArticleInsight>, StoreError> {
        self.inner.find_by_article(id).await
    }
    async fn find_by_status(&self, s: InsightStatus) -> Result<Vec<ArticleInsight>, StoreError> {
        self.inner.find_by_status(s).await
    }
    async fn list(&self) -> Result<Vec<ArticleInsight>, StoreError> {
        InsightStore::list(&self.inner).await
    }
}

/// Records every document pushed; optionally fails every call.
#[derive(Default)]
pub struct RecordingSearch {
    pub docs: Mutex<Vec<ArticleDocument>>,
    pub deleted: Mutex<Vec<ArticleId>>,
    pub cleared: AtomicUsize,
    pub fail: bool,
}

impl RecordingSearch {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn doc_ids(&self) -> Vec<ArticleId> {
        self.docs.lock().unwrap().iter().map(|d| d.id).collect()
    }
}

#[async_trait]
impl SearchSync for RecordingSearch {
    async fn init(&self) -> Result<()> {
        Ok(())
    }
    async fn add_documents(&self, docs: &[ArticleDocument]) -> Result<()> {
        if self.fail {
            anyhow::bail!("search unavailable");
        }
        self.docs.lock().unwrap().extend_from_slice(docs);
        Ok(())
    }
    async fn delete_document(&self, id: ArticleId) -> Result<()> {
        if self.fail {
            anyhow::bail!("search unavailable");
        }
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
    async fn delete_all(&self) -> Result<()> {
        if self.fail {
            anyhow::bail!("search unavailable");
        }
        self.cleared.fetch_add(1, Ordering::SeqCst);
        self.docs.lock().unwrap().clear();
        Ok(())
    }
}

/// Serves canned items per feed URL; unknown URLs yield nothing.
#[derive(Default)]
pub struct StaticFeedReader {
    pub feeds: HashMap<String, Vec<FeedItem>>,
}

impl StaticFeedReader {
    pub fn with(mut self, url: &str, items: Vec<FeedItem>) -> Self {
        self.feeds.insert(url.to_string(), items);
        self
    }
}

#[async_trait]
impl FeedReader for StaticFeedReader {
    async fn parse_feed(&self, url: &str) -> Vec<FeedItem> {
        self.feeds.get(url).cloned().unwrap_or_default()
    }
}

pub fn feed_item(title: &str, link: &str) -> FeedItem {
    FeedItem {
        title: title.into(),
        description: format!("<p>About {title}</p>"),
        pub_date: "2025-06-10T12:30:00Z".into(),
        source_url: link.into(),
    }
}

/// Stores `n` articles titled `a1..an`.
pub async fn seed_articles(store: &MemoryStore, n: usize) -> Vec<Article> {
    let mut out = Vec::with_capacity(n);
    for i in 1..=n {
        let a = ArticleStore::create(
            store,
            NewArticle {
                title: format!("a{i}"),
                description: Some(format!("body {i}")),
                publication_date: None,
                source_url: Some(format!("https://news.test/{i}")),
            },
        )
        .await
        .unwrap();
        out.push(a);
    }
    out
}

pub fn orchestrator(
    extractor: Arc<dyn Extractor>,
    insights: Arc<dyn InsightStore>,
    store: &MemoryStore,
    search: Arc<dyn SearchSync>,
    batch_size: usize,
) -> BatchExtractor {
    BatchExtractor::new(
        extractor,
        insights,
        Arc::new(store.clone()),
        search,
        PipelineConfig::without_delays(batch_size),
    )
}
