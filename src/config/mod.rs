// src/config/mod.rs
//! Runtime configuration: files under `config/` plus env overrides.

pub mod pipeline;
pub mod provider;

use std::path::PathBuf;
use std::str::FromStr;

pub use pipeline::PipelineConfig;
pub use provider::ProviderConfig;

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Parse an env var, ignoring unset or unparsable values.
pub(crate) fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// "1"/"true"/"yes"/"on" and their negatives; anything else is `None`.
pub(crate) fn env_flag(key: &str) -> Option<bool> {
    let v = std::env::var(key).ok()?;
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Meilisearch base URL; `None` disables search sync.
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("MEILISEARCH_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            api_key: std::env::var("MEILI_MASTER_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// UTC wall-clock trigger.
    pub hour: u32,
    pub minute: u32,
    /// Also re-submit failed insights after the unprocessed sweep.
    pub retry_failed: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: 10,
            minute: 0,
            retry_failed: false,
        }
    }
}

/// Parses `HH:MM` (24h).
pub fn parse_hh_mm(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some((h, m))
}

impl ScheduleConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(at) = std::env::var("SWEEP_AT") {
            match parse_hh_mm(&at) {
                Some((h, m)) => {
                    cfg.hour = h;
                    cfg.minute = m;
                }
                None => tracing::warn!(value = %at, "ignoring invalid SWEEP_AT"),
            }
        }
        if let Some(on) = env_flag("SWEEP_ENABLED") {
            cfg.enabled = on;
        }
        if let Some(on) = env_flag("SWEEP_RETRY_FAILED") {
            cfg.retry_failed = on;
        }
        cfg
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub provider: ProviderConfig,
    pub search: SearchConfig,
    pub schedule: ScheduleConfig,
    pub default_page_size: usize,
    /// Explicit seed file for source configurations ($SOURCES_PATH).
    pub sources_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            pipeline: PipelineConfig::load_default()?,
            provider: ProviderConfig::load_default()?,
            search: SearchConfig::from_env(),
            schedule: ScheduleConfig::from_env(),
            default_page_size: env_parse::<usize>("DEFAULT_PAGE_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_PAGE_SIZE),
            sources_path: std::env::var("SOURCES_PATH").ok().map(PathBuf::from),
        })
    }
}
