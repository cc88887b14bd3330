use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::*;
use crate::search::{RebuildCounts, ShardStats};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's session id
pub const SESSION_ID_HEADER: &str = "x-session-id";

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_content_type(raw: &str) -> Result<ContentType> {
    ContentType::from_str(raw)
        .map_err(|_| AppError::Validation(format!("unknown content type '{}'", raw)))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let shards = state.maintainer.stats().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        shards,
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub shards: ShardStats,
}

/// Run a federated search
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>> {
    let request = params.into_request(Requester {
        user_id: header_value(&headers, USER_ID_HEADER),
        session_id: header_value(&headers, SESSION_ID_HEADER),
    });

    let response = state.search.execute(&request).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(rename = "type")]
    pub content_type: Option<TypeFilter>,
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub resolved: Option<bool>,
    pub doc_path: Option<String>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl SearchParams {
    fn into_request(self, requester: Requester) -> SearchRequest {
        let filters = SearchFilters {
            content_type: self.content_type.unwrap_or_default(),
            user_id: self.user_id,
            status: self.status,
            resolved: self.resolved,
            doc_path: self.doc_path,
            before: self.before,
            after: self.after,
        };

        SearchRequest::new(self.q)
            .with_filters(filters)
            .with_page(
                self.offset.unwrap_or(0),
                self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            )
            .with_requester(requester)
    }
}

/// Autocomplete for a partially typed query
pub async fn suggestions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<SuggestionsResponse>> {
    let user_id = header_value(&headers, USER_ID_HEADER);
    let limit = params
        .limit
        .unwrap_or(state.suggestions.config().default_limit);

    let suggestions = state
        .suggestions
        .get_suggestions(&params.q, user_id.as_deref(), limit)
        .await?;

    Ok(Json(SuggestionsResponse { suggestions }))
}

#[derive(Debug, Deserialize)]
pub struct SuggestionParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

/// Record that a search result was opened
pub async fn record_click(
    State(state): State<AppState>,
    Json(request): Json<ClickRequest>,
) -> Result<StatusCode> {
    request.validate()?;

    state
        .analytics
        .log_search_click(&SearchClick {
            search_id: request.search_id,
            result_id: request.result_id,
            result_type: request.result_type.to_string(),
            result_rank: request.result_rank,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClickRequest {
    pub search_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub result_id: String,
    pub result_type: ContentType,
    pub result_rank: u32,
}

/// The caller's recent searches, newest first
pub async fn search_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<UserSearchHistoryEntry>>> {
    let user_id = header_value(&headers, USER_ID_HEADER).ok_or_else(|| {
        AppError::Validation(format!("the {} header is required", USER_ID_HEADER))
    })?;

    let history = state
        .analytics
        .get_user_search_history(&user_id, params.limit.unwrap_or(DEFAULT_PAGE_SIZE))
        .await?;

    Ok(Json(history))
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// Dashboard metrics over the last `days` days (default 7)
pub async fn search_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricsParams>,
) -> Result<Json<SearchMetrics>> {
    params.validate()?;
    let window = MetricsWindow::last_days(params.days.unwrap_or(7));
    Ok(Json(state.analytics.get_metrics(window).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct MetricsParams {
    #[validate(range(min = 1, max = 3650))]
    pub days: Option<u32>,
}

/// Most searched queries
pub async fn popular_searches(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<PopularQuery>>> {
    let limit = params.limit.unwrap_or(10).min(100);
    Ok(Json(state.analytics.get_popular_searches(limit).await?))
}

/// Response-time distribution over retained searches
pub async fn performance_stats(State(state): State<AppState>) -> Result<Json<PerformanceStats>> {
    Ok(Json(state.analytics.get_performance_stats().await?))
}

/// Delete search logs older than `days_to_keep` days
pub async fn cleanup(
    State(state): State<AppState>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<CleanupResponse>> {
    request.validate()?;
    let deleted = state
        .analytics
        .clear_old_search_data(request.days_to_keep)
        .await?;
    Ok(Json(CleanupResponse { deleted }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CleanupRequest {
    #[validate(range(min = 1))]
    pub days_to_keep: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub deleted: u64,
}

/// Rebuild every shard from canonical storage
pub async fn reindex(State(state): State<AppState>) -> Result<Json<RebuildCounts>> {
    Ok(Json(state.maintainer.rebuild_all().await?))
}

/// Replace one row of a shard
pub async fn upsert_record(
    State(state): State<AppState>,
    Path(content_type): Path<String>,
    Json(record): Json<IndexedRecord>,
) -> Result<StatusCode> {
    let content_type = parse_content_type(&content_type)?;
    state.maintainer.upsert(content_type, record).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove one row from a shard
pub async fn remove_record(
    State(state): State<AppState>,
    Path((content_type, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let content_type = parse_content_type(&content_type)?;
    state.maintainer.remove(content_type, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Prometheus metrics endpoint
///
/// Returns metrics in Prometheus text exposition format
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
}
