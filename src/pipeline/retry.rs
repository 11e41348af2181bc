// src/pipeline/retry.rs
use std::collections::HashSet;

use tracing::info;

use super::BatchExtractor;
use crate::error::PipelineError;
use crate::model::{Article, ArticleId, ArticleInsight, InsightStatus};

impl BatchExtractor {
    /// Re-run the pipeline for those `candidates` whose stored insight is
    /// `failed`. New outcomes overwrite the old insights.
    pub async fn retry_failed_articles(
        &self,
        candidates: &[Article],
    ) -> Result<Vec<ArticleInsight>, PipelineError> {
        let failed = self.insights.find_by_status(InsightStatus::Failed).await?;
        if failed.is_empty() {
            info!("No failed articles to retry");
            return Ok(Vec::new());
        }

        let failed_ids: HashSet<ArticleId> = failed.iter().map(|i| i.article_id).collect();
        let to_retry: Vec<Article> = candidates
            .iter()
            .filter(|a| failed_ids.contains(&a.id))
            .cloned()
            .collect();

        if to_retry.is_empty() {
            info!("No matching articles found for retry");
            return Ok(Vec::new());
        }

        info!(count = to_retry.len(), "retrying failed articles");
        self.process_articles(&to_retry).await
    }
}
