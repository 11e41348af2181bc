// src/ingest/config.rs
//! Seed source configurations from a file at startup.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::NewSourceConfiguration;

const ENV_PATH: &str = "SOURCES_PATH";

#[derive(Debug, Deserialize)]
struct SeedEntry {
    name: String,
    #[serde(alias = "sources")]
    urls: Vec<String>,
}

/// Load seeds from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<NewSourceConfiguration>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load seeds using env var + fallbacks:
/// 1) $SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<NewSourceConfiguration>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<NewSourceConfiguration>> {
    if hint_ext == "toml" || s.contains("[[sources]]") {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    parse_toml(s).map_err(|_| anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<NewSourceConfiguration>> {
    #[derive(Deserialize)]
    struct TomlSeeds {
        sources: Vec<SeedEntry>,
    }
    let v: TomlSeeds = toml::from_str(s)?;
    Ok(clean(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<NewSourceConfiguration>> {
    let v: Vec<SeedEntry> = serde_json::from_str(s)?;
    Ok(clean(v))
}

/// Trim URLs, drop blanks and repeats (first occurrence wins).
pub fn normalize_sources<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .map(|u| u.as_ref().trim())
        .filter(|u| !u.is_empty() && seen.insert(u.to_string()))
        .map(str::to_string)
        .collect()
}

/// Drop entries left without a name or URLs.
fn clean(entries: Vec<SeedEntry>) -> Vec<NewSourceConfiguration> {
    entries
        .into_iter()
        .filter_map(|e| {
            let name = e.name.trim().to_string();
            let sources = normalize_sources(&e.urls);
            (!name.is_empty() && !sources.is_empty())
                .then_some(NewSourceConfiguration { name, sources })
        })
        .collect()
}
