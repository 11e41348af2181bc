// src/pipeline/mod.rs
//! Batch extraction orchestrator.
//!
//! Articles are cut into fixed-size batches. Each batch waits the pacing
//! delay, then runs all of its members concurrently; every member waits the
//! pacing delay again, calls the provider, and persists its insight. A batch
//! fully settles before the next one starts, with a short cooldown in between.
//!
//! Provider failures only degrade the affected article to a `failed` insight.
//! A save that exhausts its retry budget aborts the run.

mod persist;
mod retry;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::DynExtractor;
use crate::model::{Article, ArticleInsight, InsightStatus};
use crate::search::DynSearch;
use crate::store::{ArticleStore, InsightStore};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "pipeline_runs_total",
            "Enrichment runs, labelled by outcome."
        );
        describe_counter!("pipeline_batches_total", "Batches processed.");
        describe_counter!(
            "pipeline_insights_total",
            "Insights produced, labelled by status."
        );
        describe_counter!(
            "pipeline_save_retries_total",
            "Insight saves that failed and were retried."
        );
        describe_counter!(
            "pipeline_save_failures_total",
            "Insight saves that exhausted their retries."
        );
        describe_histogram!(
            "pipeline_provider_call_ms",
            "Extraction provider latency in milliseconds."
        );
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when an enrichment run last ended."
        );
    });
}

fn record_run(outcome: &'static str) {
    counter!("pipeline_runs_total", "outcome" => outcome).increment(1);
    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// One insight per input article, in input order.
    pub insights: Vec<ArticleInsight>,
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct BatchExtractor {
    extractor: DynExtractor,
    insights: Arc<dyn InsightStore>,
    articles: Arc<dyn ArticleStore>,
    search: DynSearch,
    cfg: PipelineConfig,
}

impl BatchExtractor {
    pub fn new(
        extractor: DynExtractor,
        insights: Arc<dyn InsightStore>,
        articles: Arc<dyn ArticleStore>,
        search: DynSearch,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            insights,
            articles,
            search,
            cfg,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Enrich `articles` and return their insights in input order.
    pub async fn process_articles(
        &self,
        articles: &[Article],
    ) -> Result<Vec<ArticleInsight>, PipelineError> {
        Ok(self.run(articles).await?.insights)
    }

    /// Same as [`process_articles`](Self::process_articles) with batch and
    /// outcome counts.
    pub async fn run(&self, articles: &[Article]) -> Result<RunReport, PipelineError> {
        let mut report = RunReport::default();
        if articles.is_empty() {
            return Ok(report);
        }
        ensure_metrics_described();

        let total = articles.len();
        let processed = AtomicUsize::new(0);
        let mut batches = articles.chunks(self.cfg.batch_size.max(1)).peekable();

        while let Some(batch) = batches.next() {
            sleep(self.cfg.batch_delay).await;

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|article| self.process_one(article, &processed, total)),
            )
            .await;
            report.batches += 1;
            counter!("pipeline_batches_total").increment(1);

            let mut batch_results = Vec::with_capacity(batch.len());
            for outcome in outcomes {
                match outcome {
                    Ok(insight) => batch_results.push(insight),
                    Err(e) => {
                        error!(error = %e, batch = report.batches, "batch processing failed");
                        record_run("error");
                        return Err(e);
                    }
                }
            }
            report.insights.extend(batch_results);

            if batches.peek().is_some() {
                sleep(self.cfg.batch_cooldown).await;
            }
        }

        report.succeeded = report
            .insights
            .iter()
            .filter(|i| i.status == InsightStatus::Success)
            .count();
        report.failed = report.insights.len() - report.succeeded;

        record_run("ok");
        counter!("pipeline_insights_total", "status" => "success")
            .increment(report.succeeded as u64);
        counter!("pipeline_insights_total", "status" => "failed").increment(report.failed as u64);

        info!(
            success = report.succeeded,
            failed = report.failed,
            batches = report.batches,
            "Processing completed"
        );
        Ok(report)
    }

    async fn process_one(
        &self,
        article: &Article,
        processed: &AtomicUsize,
        total: usize,
    ) -> Result<ArticleInsight, PipelineError> {
        sleep(self.cfg.item_delay).await;

        let t0 = Instant::now();
        let outcome = self
            .extractor
            .extract(&article.title, article.description.as_deref().unwrap_or_default())
            .await;
        histogram!("pipeline_provider_call_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let insight = match outcome {
            Ok(extracted) => ArticleInsight::success(article.id, extracted),
            Err(e) => {
                warn!(
                    article_id = article.id,
                    provider = self.extractor.name(),
                    error = %e,
                    "extraction failed; recording failed insight"
                );
                ArticleInsight::failed(article.id)
            }
        };

        let saved = self.save_insight(insight).await?;
        if saved.is_success() {
            let n = processed.fetch_add(1, Ordering::Relaxed) + 1;
            info!(article_id = article.id, "Processed {n}/{total} articles");
        }
        Ok(saved)
    }
}
