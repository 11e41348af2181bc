// src/error.rs
//! Error types shared across the pipeline.

use thiserror::Error;
use uuid::Uuid;

use crate::model::ArticleId;

/// Failure at the text-analysis provider boundary. Every variant is recovered
/// by the orchestrator as a `failed` insight.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction provider is disabled")]
    Disabled,

    #[error("no API key configured for provider {0}")]
    MissingApiKey(&'static str),

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    Parse(String),
}

/// Failure of a store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Run-level failure surfaced to callers of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to save insight for article {article_id} after {attempts} attempts: {source}")]
    Persistence {
        article_id: ArticleId,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("source configuration not found: {0}")]
    ConfigurationNotFound(Uuid),
}
