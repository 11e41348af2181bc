// src/search/meili.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{ArticleDocument, SearchSync};
use crate::model::ArticleId;

pub const INDEX_NAME: &str = "article";

const SEARCHABLE: &[&str] = &[
    "title",
    "description",
    "topics",
    "keywords",
    "people",
    "organizations",
    "locations",
    "category",
];
const FILTERABLE: &[&str] = &[
    "title",
    "topics",
    "category",
    "keywords",
    "people",
    "organizations",
    "locations",
    "publicationDate",
];
const SORTABLE: &[&str] = &["publicationDate", "title", "category"];

pub struct MeiliSearchSync {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl MeiliSearchSync {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building meilisearch client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/indexes/{}{}", self.base_url, INDEX_NAME, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl SearchSync for MeiliSearchSync {
    async fn init(&self) -> Result<()> {
        let body = serde_json::json!({
            "searchableAttributes": SEARCHABLE,
            "filterableAttributes": FILTERABLE,
            "sortableAttributes": SORTABLE,
        });
        self.authed(self.client.patch(self.url("/settings")))
            .json(&body)
            .send()
            .await
            .context("meilisearch settings")?
            .error_for_status()
            .context("meilisearch settings non-2xx")?;
        Ok(())
    }

    async fn add_documents(&self, docs: &[ArticleDocument]) -> Result<()> {
        self.authed(self.client.post(self.url("/documents")))
            .json(docs)
            .send()
            .await
            .context("meilisearch add documents")?
            .error_for_status()
            .context("meilisearch add documents non-2xx")?;
        Ok(())
    }

    async fn delete_document(&self, id: ArticleId) -> Result<()> {
        self.authed(self.client.delete(self.url(&format!("/documents/{id}"))))
            .send()
            .await
            .context("meilisearch delete document")?
            .error_for_status()
            .context("meilisearch delete document non-2xx")?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        self.authed(self.client.delete(self.url("/documents")))
            .send()
            .await
            .context("meilisearch delete all")?
            .error_for_status()
            .context("meilisearch delete all non-2xx")?;
        Ok(())
    }
}
