// src/ingest/rss.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::ingest::types::{FeedItem, FeedReader};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RFC 2822 (or already RFC 3339) → RFC 3339 UTC; anything else → `now`.
pub fn normalize_pub_date(ts: Option<&str>, now: OffsetDateTime) -> String {
    let parsed = ts.map(str::trim).and_then(|s| {
        OffsetDateTime::parse(s, &Rfc2822)
            .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
            .ok()
    });
    parsed
        .unwrap_or(now)
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub struct RssFeedReader {
    client: reqwest::Client,
}

impl RssFeedReader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feed-insights/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("building feed http client")?;
        Ok(Self { client })
    }

    /// Parse RSS 2.0 XML into feed items.
    pub fn parse_items_from_str(xml: &str) -> Result<Vec<FeedItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
        let now = OffsetDateTime::now_utc();

        let out: Vec<FeedItem> = rss
            .channel
            .item
            .into_iter()
            .map(|it| FeedItem {
                title: it.title.unwrap_or_default(),
                description: it.description.unwrap_or_default(),
                pub_date: normalize_pub_date(it.pub_date.as_deref(), now),
                source_url: it.link.map(|l| l.trim().to_string()).unwrap_or_default(),
            })
            .collect();

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<FeedItem>> {
        let body = self
            .client
            .get(url)
            .send()
            .await
            .context("feed http get()")?
            .error_for_status()
            .context("feed non-2xx")?
            .text()
            .await
            .context("feed http .text()")?;
        Self::parse_items_from_str(&body)
    }
}

#[async_trait]
impl FeedReader for RssFeedReader {
    async fn parse_feed(&self, url: &str) -> Vec<FeedItem> {
        match self.fetch(url).await {
            Ok(items) if items.is_empty() => {
                tracing::warn!(url, "No items found in feed");
                Vec::new()
            }
            Ok(items) => {
                counter!("ingest_feed_items_total").increment(items.len() as u64);
                items
            }
            Err(e) => {
                tracing::error!(url, "Failed to parse feed: {e:#}");
                counter!("ingest_feed_errors_total").increment(1);
                Vec::new()
            }
        }
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_becomes_rfc3339_utc() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let out = normalize_pub_date(Some("Tue, 10 Jun 2025 14:30:00 +0200"), now);
        assert_eq!(out, "2025-06-10T12:30:00Z");
    }

    #[test]
    fn missing_or_bad_date_falls_back_to_now() {
        let now = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(normalize_pub_date(None, now), "1970-01-01T00:00:00Z");
        assert_eq!(
            normalize_pub_date(Some("yesterday-ish"), now),
            "1970-01-01T00:00:00Z"
        );
    }

    #[test]
    fn channel_without_items_parses_empty() {
        let xml = r#"<rss version="2.0"><channel><title>Empty</title></channel></rss>"#;
        let items = RssFeedReader::parse_items_from_str(xml).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(RssFeedReader::parse_items_from_str("not xml at all").is_err());
    }
}
