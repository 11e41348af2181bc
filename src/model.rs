// src/model.rs
//! Records flowing through the pipeline: articles, their insights, and the
//! source configurations that feed them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ArticleId = u64;

/// Category stored when the provider does not name one.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub publication_date: Option<String>,
    pub source_url: Option<String>,
    /// True once the article has completed one pass through the pipeline,
    /// whatever the outcome of that pass was.
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by ingestion; the store assigns identity and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewArticle {
    pub title: String,
    pub description: Option<String>,
    pub publication_date: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    Success,
    Failed,
}

impl InsightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInsight {
    /// Assigned by the insight store on first save; kept on overwrite.
    pub id: Option<u64>,
    pub uuid: Uuid,
    pub article_id: ArticleId,
    pub topics: Option<String>,
    pub keywords: Option<String>,
    pub people: Option<String>,
    pub organizations: Option<String>,
    pub locations: Option<String>,
    pub category: Option<String>,
    pub status: InsightStatus,
}

impl ArticleInsight {
    /// Flattens a provider result into a `success` insight.
    pub fn success(article_id: ArticleId, extracted: ExtractedInsight) -> Self {
        let ExtractedInsight {
            topics,
            keywords,
            named_entities,
            category,
        } = extracted;
        let category = if category.trim().is_empty() {
            UNKNOWN_CATEGORY.to_string()
        } else {
            category
        };
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            article_id,
            topics: Some(topics),
            keywords: Some(keywords),
            people: Some(named_entities.people),
            organizations: Some(named_entities.organizations),
            locations: Some(named_entities.locations),
            category: Some(category),
            status: InsightStatus::Success,
        }
    }

    /// Failure marker: only the article reference and status are set.
    pub fn failed(article_id: ArticleId) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            article_id,
            topics: None,
            keywords: None,
            people: None,
            organizations: None,
            locations: None,
            category: None,
            status: InsightStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == InsightStatus::Success
    }
}

/// Canonical provider output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInsight {
    pub topics: String,
    pub keywords: String,
    pub named_entities: NamedEntities,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedEntities {
    pub people: String,
    pub organizations: String,
    pub locations: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfiguration {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub sources: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSourceConfiguration {
    pub name: String,
    pub sources: Vec<String>,
}
