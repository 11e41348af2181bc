// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use metrics::{counter, gauge};
use tokio::task::JoinHandle;

use crate::config::ScheduleConfig;
use crate::ingest::IngestCoordinator;

/// Time left until the next `hh:mm` UTC strictly after `now`.
pub fn duration_until_next(now: DateTime<Utc>, hour: u32, minute: u32) -> Duration {
    let at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(at).and_utc();
    let next = if today > now {
        today
    } else {
        today + TimeDelta::days(1)
    };
    (next - now).to_std().unwrap_or_default()
}

/// One sweep: fetch every source configuration, enrich what is still
/// unprocessed, optionally re-submit failed insights.
pub async fn run_daily_sweep(ingest: &IngestCoordinator, retry_failed: bool) -> anyhow::Result<()> {
    let configs = ingest.sources().list().await?;
    if configs.is_empty() {
        tracing::info!("No source configurations found");
        return Ok(());
    }

    for cfg in &configs {
        if let Err(e) = ingest.fetch(cfg.uuid).await {
            tracing::error!(source = %cfg.name, error = %e, "scheduled fetch failed");
        }
    }

    ingest.process_unprocessed().await?;
    if retry_failed {
        ingest.retry_failed().await?;
    }
    Ok(())
}

/// Background task running [`run_daily_sweep`] every day at the configured time.
pub fn spawn_daily_sweep(ingest: Arc<IngestCoordinator>, cfg: ScheduleConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = duration_until_next(Utc::now(), cfg.hour, cfg.minute);
            tracing::debug!(secs = wait.as_secs(), "next sweep scheduled");
            tokio::time::sleep(wait).await;

            tracing::info!(target: "ingest", "daily sweep started");
            match run_daily_sweep(&ingest, cfg.retry_failed).await {
                Ok(()) => counter!("ingest_sweeps_total", "outcome" => "ok").increment(1),
                Err(e) => {
                    counter!("ingest_sweeps_total", "outcome" => "error").increment(1);
                    tracing::error!(target: "ingest", "daily sweep failed: {e:#}");
                }
            }
            gauge!("ingest_last_sweep_ts").set(Utc::now().timestamp() as f64);
        }
    })
}
