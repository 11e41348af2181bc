// src/pipeline/persist.rs
use metrics::counter;
use tokio::time::sleep;
use tracing::{error, warn};

use super::BatchExtractor;
use crate::error::{PipelineError, StoreError};
use crate::model::ArticleInsight;
use crate::search::ArticleDocument;

impl BatchExtractor {
    /// Persist `insight` and mark its article processed, retrying with linear
    /// backoff (`n * save_backoff` after the n-th failure). Successful insights
    /// are then mirrored to search; search errors are only logged.
    pub(crate) async fn save_insight(
        &self,
        insight: ArticleInsight,
    ) -> Result<ArticleInsight, PipelineError> {
        let attempts = self.cfg.save_attempts.max(1);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.try_save(&insight).await {
                Ok(saved) => {
                    if saved.is_success() {
                        self.sync_search(&saved).await;
                    }
                    return Ok(saved);
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        article_id = insight.article_id,
                        attempt,
                        error = %e,
                        "saving insight failed, retrying"
                    );
                    counter!("pipeline_save_retries_total").increment(1);
                    sleep(self.cfg.save_backoff * attempt).await;
                }
                Err(e) => {
                    error!(
                        article_id = insight.article_id,
                        attempts,
                        error = %e,
                        "Failed to save insight after {attempts} attempts"
                    );
                    counter!("pipeline_save_failures_total").increment(1);
                    return Err(PipelineError::Persistence {
                        article_id: insight.article_id,
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }

    /// One attempt: insight row first, then the article flag. The flag flips
    /// for failed insights too.
    async fn try_save(&self, insight: &ArticleInsight) -> Result<ArticleInsight, StoreError> {
        let saved = self.insights.save(insight.clone()).await?;
        self.articles.set_processed(saved.article_id, true).await?;
        Ok(saved)
    }

    async fn sync_search(&self, insight: &ArticleInsight) {
        let article = match self.articles.find_by_id(insight.article_id).await {
            Ok(Some(a)) => a,
            Ok(None) => {
                warn!(article_id = insight.article_id, "search sync: article vanished");
                return;
            }
            Err(e) => {
                warn!(
                    article_id = insight.article_id,
                    error = %e,
                    "search sync: article lookup failed"
                );
                return;
            }
        };
        let doc = ArticleDocument::from_parts(&article, insight);
        if let Err(e) = self.search.add_documents(&[doc]).await {
            warn!(article_id = insight.article_id, "search sync failed: {e:#}");
        }
    }
}
