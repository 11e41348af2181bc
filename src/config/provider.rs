// src/config/provider.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

use super::env_flag;

pub const DEFAULT_PROVIDER_CONFIG_PATH: &str = "config/extractor.json";
pub const ENV_PROVIDER_API_KEY: &str = "EXTRACTOR_API_KEY";

fn default_provider() -> String {
    "groq".to_string()
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}
fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}
fn default_max_body_chars() -> usize {
    4_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub enabled: bool,
    /// Label for logs/metrics ("groq", "openai", ...). Any OpenAI-compatible
    /// chat-completions endpoint works.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from EXTRACTOR_API_KEY
    #[serde(default)]
    pub api_key: String,
    /// Body prefix sent upstream, in characters.
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
            max_body_chars: default_max_body_chars(),
        }
    }
}

impl ProviderConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: ProviderConfig = serde_json::from_str(&data)?;
        cfg.normalize()?;
        Ok(cfg)
    }

    /// Built from `EXTRACTOR_*` env vars; enabled whenever a key is present
    /// unless `EXTRACTOR_ENABLED=0`.
    pub fn from_env() -> Self {
        let api_key = env::var(ENV_PROVIDER_API_KEY).unwrap_or_default();
        let defaults = Self::default();
        Self {
            enabled: env_flag("EXTRACTOR_ENABLED").unwrap_or(!api_key.is_empty()),
            provider: env::var("EXTRACTOR_PROVIDER").unwrap_or(defaults.provider),
            base_url: env::var("EXTRACTOR_BASE_URL").unwrap_or(defaults.base_url),
            model: env::var("EXTRACTOR_MODEL").unwrap_or(defaults.model),
            api_key,
            max_body_chars: super::env_parse("EXTRACTOR_MAX_BODY_CHARS")
                .unwrap_or(defaults.max_body_chars),
        }
    }

    /// `config/extractor.json` when present, env otherwise.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = env::var("EXTRACTOR_CONFIG_PATH")
            .unwrap_or_else(|_| DEFAULT_PROVIDER_CONFIG_PATH.to_string());
        if Path::new(&path).exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::from_env())
        }
    }

    fn normalize(&mut self) -> anyhow::Result<()> {
        self.provider = self.provider.to_lowercase();
        self.base_url = self.base_url.trim_end_matches('/').to_string();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var(ENV_PROVIDER_API_KEY)
                .map_err(|_| anyhow::anyhow!("Missing {ENV_PROVIDER_API_KEY} env var"))?;
        }

        if self.max_body_chars == 0 {
            self.max_body_chars = default_max_body_chars();
        }
        Ok(())
    }
}
