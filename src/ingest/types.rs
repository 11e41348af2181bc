// src/ingest/types.rs
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    /// RFC 3339, UTC
    pub pub_date: String,
    pub source_url: String,
}

/// Reads one feed. Never fails: problems are logged and yield an empty list.
#[async_trait::async_trait]
pub trait FeedReader: Send + Sync {
    async fn parse_feed(&self, url: &str) -> Vec<FeedItem>;
}
