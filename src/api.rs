use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::error::{PipelineError, StoreError};
use crate::ingest::config::normalize_sources;
use crate::ingest::IngestCoordinator;
use crate::model::{Article, ArticleInsight, NewSourceConfiguration, SourceConfiguration};
use crate::search::{rebuild_index, DynSearch};
use crate::store::{ArticleStore, InsightStore, SourceConfigStore};

#[derive(Clone)]
pub struct AppState {
    pub articles: Arc<dyn ArticleStore>,
    pub insights: Arc<dyn InsightStore>,
    pub sources: Arc<dyn SourceConfigStore>,
    pub search: DynSearch,
    pub ingest: Arc<IngestCoordinator>,
    /// Upper bound for `limit` on list endpoints.
    pub page_size: usize,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/api/source-configuration",
            post(create_source_configuration).get(list_source_configurations),
        )
        .route(
            "/api/source-configuration/{uuid}",
            get(get_source_configuration)
                .patch(update_source_configuration)
                .delete(delete_source_configuration),
        )
        .route("/api/article", post(fetch_articles).get(list_articles))
        .route("/api/article/retry-failed", post(retry_failed))
        .route("/api/article/process-unprocessed", post(process_unprocessed))
        .route("/api/article/{uuid}", get(get_article).delete(delete_article))
        .route("/api/search/rebuild", post(rebuild_search))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------- envelope & errors ----------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status_code: u16,
    pub message: String,
    pub result: T,
}

type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiError>;

fn respond<T: Serialize>(status: StatusCode, message: &str, result: T) -> ApiResult<T> {
    Ok((
        status,
        Json(Envelope {
            status_code: status.as_u16(),
            message: message.to_string(),
            result,
        }),
    ))
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => Self::NotFound(e.to_string()),
            StoreError::Conflict(_) => Self::Conflict(e.to_string()),
            StoreError::Unavailable(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::ConfigurationNotFound(_) => Self::NotFound(e.to_string()),
            other => {
                tracing::error!(error = %other, "pipeline run failed");
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::NotFound(m) | Self::BadRequest(m) | Self::Conflict(m) | Self::Internal(m) => m,
        };
        let body = Envelope {
            status_code: status.as_u16(),
            message,
            result: serde_json::Value::Null,
        };
        (status, Json(body)).into_response()
    }
}

// ---------- pagination ----------

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_items: usize,
    pub item_count: usize,
    pub items_per_page: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

/// 1-based page of `items`; `limit` is clamped to `1..=max_limit`.
pub fn paginate<T>(
    items: Vec<T>,
    page: Option<usize>,
    limit: Option<usize>,
    max_limit: usize,
) -> Page<T> {
    let max_limit = max_limit.max(1);
    let per_page = limit.unwrap_or(max_limit).clamp(1, max_limit);
    let current_page = page.unwrap_or(1).max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);

    let items: Vec<T> = items
        .into_iter()
        .skip(current_page.saturating_sub(1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    Page {
        meta: PageMeta {
            total_items,
            item_count: items.len(),
            items_per_page: per_page,
            total_pages,
            current_page,
        },
        items,
    }
}

fn matches_search(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
        None => true,
    }
}

// ---------- source configurations ----------

#[derive(Debug, Deserialize)]
struct CreateSourceConfigurationReq {
    name: String,
    sources: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateSourceConfigurationReq {
    name: Option<String>,
    sources: Option<Vec<String>>,
}

fn validated(name: &str, sources: &[String]) -> Result<NewSourceConfiguration, ApiError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }
    let sources = normalize_sources(sources);
    if sources.is_empty() {
        return Err(ApiError::BadRequest("sources must not be empty".into()));
    }
    Ok(NewSourceConfiguration { name, sources })
}

async fn create_source_configuration(
    State(state): State<AppState>,
    Json(body): Json<CreateSourceConfigurationReq>,
) -> ApiResult<SourceConfiguration> {
    let cfg = state
        .sources
        .create(validated(&body.name, &body.sources)?)
        .await?;
    respond(StatusCode::CREATED, "Source configuration created", cfg)
}

async fn list_source_configurations(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Page<SourceConfiguration>> {
    let mut rows: Vec<SourceConfiguration> = state
        .sources
        .list()
        .await?
        .into_iter()
        .filter(|c| matches_search(&c.name, q.search.as_deref()))
        .collect();
    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    respond(
        StatusCode::OK,
        "Source configurations retrieved",
        paginate(rows, q.page, q.limit, state.page_size),
    )
}

async fn get_source_configuration(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<SourceConfiguration> {
    let cfg = state
        .sources
        .find_by_uuid(uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("source configuration not found: {uuid}")))?;
    respond(StatusCode::OK, "Source configuration retrieved", cfg)
}

async fn update_source_configuration(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    Json(body): Json<UpdateSourceConfigurationReq>,
) -> ApiResult<SourceConfiguration> {
    let existing = state
        .sources
        .find_by_uuid(uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("source configuration not found: {uuid}")))?;
    let name = body.name.unwrap_or(existing.name);
    let sources = body.sources.unwrap_or(existing.sources);
    let cfg = state
        .sources
        .update(uuid, validated(&name, &sources)?)
        .await?;
    respond(StatusCode::OK, "Source configuration updated", cfg)
}

async fn delete_source_configuration(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<SourceConfiguration> {
    let cfg = state
        .sources
        .delete(uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("source configuration not found: {uuid}")))?;
    respond(StatusCode::OK, "Source configuration deleted", cfg)
}

// ---------- articles ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchArticlesReq {
    source_configuration_uuid: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub insight: Option<ArticleInsight>,
}

async fn fetch_articles(
    State(state): State<AppState>,
    Json(body): Json<FetchArticlesReq>,
) -> ApiResult<Vec<ArticleInsight>> {
    let insights = state.ingest.fetch(body.source_configuration_uuid).await?;
    respond(StatusCode::CREATED, "Articles fetched and processed", insights)
}

async fn list_articles(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Page<Article>> {
    let mut rows: Vec<Article> = state
        .articles
        .list()
        .await?
        .into_iter()
        .filter(|a| matches_search(&a.title, q.search.as_deref()))
        .collect();
    rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    respond(
        StatusCode::OK,
        "Articles retrieved",
        paginate(rows, q.page, q.limit, state.page_size),
    )
}

async fn get_article(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<ArticleDetail> {
    let article = state
        .articles
        .find_by_uuid(uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("article not found: {uuid}")))?;
    let insight = state.insights.find_by_article(article.id).await?;
    respond(StatusCode::OK, "Article retrieved", ArticleDetail { article, insight })
}

async fn delete_article(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Article> {
    let article = state
        .articles
        .delete(uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("article not found: {uuid}")))?;
    if let Err(e) = state.search.delete_document(article.id).await {
        tracing::warn!(article_id = article.id, "search delete failed: {e:#}");
    }
    respond(StatusCode::OK, "Article deleted", article)
}

async fn retry_failed(State(state): State<AppState>) -> ApiResult<Vec<ArticleInsight>> {
    let insights = state.ingest.retry_failed().await?;
    respond(StatusCode::OK, "Failed articles retried", insights)
}

async fn process_unprocessed(State(state): State<AppState>) -> ApiResult<Vec<ArticleInsight>> {
    let insights = state.ingest.process_unprocessed().await?;
    respond(StatusCode::OK, "Unprocessed articles processed", insights)
}

// ---------- search ----------

#[derive(Debug, Serialize)]
struct RebuildOut {
    documents: usize,
}

async fn rebuild_search(State(state): State<AppState>) -> ApiResult<RebuildOut> {
    let documents =
        rebuild_index(state.search.as_ref(), state.articles.as_ref(), state.insights.as_ref())
            .await?;
    respond(StatusCode::OK, "Search index rebuilt", RebuildOut { documents })
}
