// src/config/pipeline.rs
//! Pacing and retry settings for the enrichment orchestrator.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::env_parse;

pub const DEFAULT_PIPELINE_CONFIG_PATH: &str = "config/pipeline.toml";
pub const ENV_PIPELINE_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";

/// Provider calls per minute the pacing is tuned for.
pub const DEFAULT_RATE_LIMIT: u32 = 30;
pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_COOLDOWN_MS: u64 = 1_000;
pub const DEFAULT_SAVE_ATTEMPTS: u32 = 3;
pub const DEFAULT_SAVE_BACKOFF_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Provider calls per minute; derives the pacing delays.
    pub rate_limit: u32,
    /// Articles processed concurrently per batch.
    pub batch_size: usize,
    /// Sleep before each batch starts.
    pub batch_delay: Duration,
    /// Sleep inside each item before its provider call.
    pub item_delay: Duration,
    /// Sleep between two batches.
    pub batch_cooldown: Duration,
    /// Total save attempts per insight (first try included).
    pub save_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * save_backoff` after failing.
    pub save_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_rate_limit(DEFAULT_RATE_LIMIT, DEFAULT_BATCH_SIZE)
    }
}

/// `(60000 / rate_limit) * batch_size` milliseconds.
pub fn pacing_delay(rate_limit_per_minute: u32, batch_size: usize) -> Duration {
    let per_call_ms = 60_000.0 / f64::from(rate_limit_per_minute.max(1));
    Duration::from_secs_f64(per_call_ms * batch_size.max(1) as f64 / 1_000.0)
}

impl PipelineConfig {
    /// Both pacing delays derived from the rate limit, as in production.
    pub fn from_rate_limit(rate_limit_per_minute: u32, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let delay = pacing_delay(rate_limit_per_minute, batch_size);
        Self {
            rate_limit: rate_limit_per_minute,
            batch_size,
            batch_delay: delay,
            item_delay: delay,
            batch_cooldown: Duration::from_millis(DEFAULT_BATCH_COOLDOWN_MS),
            save_attempts: DEFAULT_SAVE_ATTEMPTS,
            save_backoff: Duration::from_millis(DEFAULT_SAVE_BACKOFF_MS),
        }
    }

    /// Same batching and retry budget with every sleep set to zero.
    pub fn without_delays(batch_size: usize) -> Self {
        Self {
            rate_limit: DEFAULT_RATE_LIMIT,
            batch_size: batch_size.max(1),
            batch_delay: Duration::ZERO,
            item_delay: Duration::ZERO,
            batch_cooldown: Duration::ZERO,
            save_attempts: DEFAULT_SAVE_ATTEMPTS,
            save_backoff: Duration::ZERO,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let file: PipelineFile = toml::from_str(&data)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        Ok(file.into_config())
    }

    /// Resolution order:
    /// 1) $PIPELINE_CONFIG_PATH (must exist)
    /// 2) config/pipeline.toml when present
    /// 3) built-in defaults
    ///
    /// `PIPELINE_*` env vars are applied on top.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_PIPELINE_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_PIPELINE_CONFIG_PATH} points to non-existent path");
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_PIPELINE_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_PIPELINE_CONFIG_PATH)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// A delay still at its derived value follows a new rate or batch size;
    /// explicit `*_DELAY_MS` values win.
    pub fn apply_env_overrides(&mut self) {
        let derived = pacing_delay(self.rate_limit, self.batch_size);
        if let Some(rate) = env_parse::<u32>("PIPELINE_RATE_LIMIT") {
            self.rate_limit = rate;
        }
        if let Some(size) = env_parse::<usize>("PIPELINE_BATCH_SIZE") {
            self.batch_size = size.max(1);
        }
        let rederived = pacing_delay(self.rate_limit, self.batch_size);
        if self.batch_delay == derived {
            self.batch_delay = rederived;
        }
        if self.item_delay == derived {
            self.item_delay = rederived;
        }
        if let Some(ms) = env_parse("PIPELINE_BATCH_DELAY_MS") {
            self.batch_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse("PIPELINE_ITEM_DELAY_MS") {
            self.item_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse("PIPELINE_BATCH_COOLDOWN_MS") {
            self.batch_cooldown = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<u32>("PIPELINE_SAVE_ATTEMPTS") {
            self.save_attempts = n.max(1);
        }
        if let Some(ms) = env_parse("PIPELINE_SAVE_BACKOFF_MS") {
            self.save_backoff = Duration::from_millis(ms);
        }
    }
}

/// On-disk shape; every field optional so partial files work.
#[derive(Debug, Default, Deserialize)]
struct PipelineFile {
    rate_limit: Option<u32>,
    batch_size: Option<usize>,
    batch_delay_ms: Option<u64>,
    item_delay_ms: Option<u64>,
    batch_cooldown_ms: Option<u64>,
    save_attempts: Option<u32>,
    save_backoff_ms: Option<u64>,
}

impl PipelineFile {
    fn into_config(self) -> PipelineConfig {
        let mut cfg = PipelineConfig::from_rate_limit(
            self.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT),
            self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        );
        if let Some(ms) = self.batch_delay_ms {
            cfg.batch_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.item_delay_ms {
            cfg.item_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.batch_cooldown_ms {
            cfg.batch_cooldown = Duration::from_millis(ms);
        }
        if let Some(n) = self.save_attempts {
            cfg.save_attempts = n.max(1);
        }
        if let Some(ms) = self.save_backoff_ms {
            cfg.save_backoff = Duration::from_millis(ms);
        }
        cfg
    }
}
