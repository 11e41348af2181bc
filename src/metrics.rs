use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::PipelineConfig;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the pacing settings as
    /// static gauges.
    pub fn init(cfg: &PipelineConfig) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("ingest_feed_items_total", "Feed items read.");
        describe_counter!("ingest_feed_errors_total", "Feeds that failed to fetch or parse.");
        describe_counter!(
            "ingest_articles_created_total",
            "Articles stored from feed items."
        );
        describe_gauge!("pipeline_batch_size", "Articles per batch.");
        describe_gauge!("pipeline_batch_delay_ms", "Pacing delay before each batch.");

        gauge!("pipeline_batch_size").set(cfg.batch_size as f64);
        gauge!("pipeline_batch_delay_ms").set(cfg.batch_delay.as_millis() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
