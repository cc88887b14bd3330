//! Federated query engine over the content shards

use crate::analytics::AnalyticsRecorder;
use crate::metrics::{ANALYTICS_FAILURES_TOTAL, SEARCHES_TOTAL, SEARCH_DURATION_SECONDS};
use crate::models::{IndexedRecord, NewSearchLog, SearchRequest, SearchResponse, SearchResult};
use crate::search::config::SearchConfig;
use crate::search::error::{Result, SearchError};
use crate::search::index::{IndexHit, TextIndex};
use crate::search::query::{escape_query, is_empty_phrase, plan_shard_queries};
use crate::search::ranking::{compute_facets, paginate, rank};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;

/// Main search service
pub struct SearchService {
    index: Arc<dyn TextIndex>,
    recorder: Arc<AnalyticsRecorder>,
    config: SearchConfig,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn TextIndex>,
        recorder: Arc<AnalyticsRecorder>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            recorder,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run a search across the shards selected by the request.
    ///
    /// An empty query returns an empty response without touching the index
    /// or analytics. Otherwise the search is logged in the background once
    /// the response is ready.
    pub async fn execute(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let start_time = Instant::now();
        let type_label = request.filters.content_type.label();

        if let Err(e) = self.validate(request) {
            SEARCHES_TOTAL.with_label_values(&["invalid"]).inc();
            return Err(e);
        }

        let limit = request.limit.min(self.config.max_page_size);
        let match_expr = escape_query(&request.query);
        if is_empty_phrase(&match_expr) {
            SEARCHES_TOTAL.with_label_values(&["empty"]).inc();
            return Ok(SearchResponse::empty(request.offset, limit));
        }

        let plan = plan_shard_queries(&match_expr, &request.filters);

        let shard_searches = plan
            .iter()
            .map(|(content_type, shard_query)| self.index.search(*content_type, shard_query));

        let per_shard = match try_join_all(shard_searches).await {
            Ok(per_shard) => per_shard,
            Err(e) => {
                tracing::error!(
                    query = %request.query,
                    match_expr = %match_expr,
                    error = %e,
                    "Search execution failed"
                );
                SEARCHES_TOTAL.with_label_values(&["error"]).inc();
                return Err(SearchError::ExecutionFailed);
            }
        };

        let mut merged: Vec<SearchResult> = per_shard.into_iter().flatten().map(to_result).collect();
        rank(&mut merged, self.config.tie_epsilon);

        let facets = compute_facets(&merged);
        let total = merged.len();
        let results = paginate(merged, request.offset, limit);

        let elapsed = start_time.elapsed();
        SEARCHES_TOTAL.with_label_values(&["ok"]).inc();
        SEARCH_DURATION_SECONDS
            .with_label_values(&[type_label])
            .observe(elapsed.as_secs_f64());

        tracing::debug!(
            query = %request.query,
            shards = plan.len(),
            total = total,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search executed"
        );

        self.record_in_background(request, total as u64, elapsed.as_millis() as u64);

        Ok(SearchResponse {
            results,
            total,
            facets,
            offset: request.offset,
            limit,
        })
    }

    fn validate(&self, request: &SearchRequest) -> Result<()> {
        let length = request.query.chars().count();
        if length > self.config.max_query_length {
            return Err(SearchError::InvalidInput(format!(
                "query is {} characters long, the maximum is {}",
                length, self.config.max_query_length
            )));
        }

        if let (Some(after), Some(before)) = (request.filters.after, request.filters.before) {
            if after > before {
                return Err(SearchError::InvalidInput(format!(
                    "'after' ({}) is later than 'before' ({})",
                    after.to_rfc3339(),
                    before.to_rfc3339()
                )));
            }
        }

        Ok(())
    }

    /// Log the search, bump its popular-query aggregate and, for a known
    /// user, append it to their history. Failures are logged only.
    fn record_in_background(&self, request: &SearchRequest, total: u64, elapsed_ms: u64) {
        let recorder = Arc::clone(&self.recorder);
        let filters = match serde_json::to_string(&request.filters) {
            Ok(filters) => Some(filters),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize search filters");
                None
            }
        };
        let entry = NewSearchLog {
            user_id: request.requester.user_id.clone(),
            session_id: request.requester.session_id.clone(),
            query: request.query.clone(),
            query_type: request.filters.content_type.label().to_string(),
            filters,
            result_count: total,
            response_time_ms: elapsed_ms,
        };

        tokio::spawn(async move {
            let user_id = entry.user_id.clone();
            let query = entry.query.clone();
            let filters = entry.filters.clone();

            if let Err(e) = recorder.log_search(entry).await {
                ANALYTICS_FAILURES_TOTAL.with_label_values(&["log_search"]).inc();
                tracing::warn!(query = %query, error = %e, "Failed to log search");
            }

            if let Some(user_id) = user_id {
                if let Err(e) = recorder
                    .save_user_search(&user_id, &query, filters, total)
                    .await
                {
                    ANALYTICS_FAILURES_TOTAL.with_label_values(&["save_history"]).inc();
                    tracing::warn!(user_id = %user_id, error = %e, "Failed to save search history");
                }
            }
        });
    }
}

fn to_result(hit: IndexHit) -> SearchResult {
    let status = hit.record.display_status();
    let IndexedRecord {
        id,
        content_type,
        doc_path,
        title,
        content,
        user_id,
        author_name,
        created_at,
        ..
    } = hit.record;

    SearchResult {
        id,
        content_type,
        doc_path,
        title,
        content,
        snippet: hit.snippet,
        author_name,
        author_id: user_id,
        status,
        created_at: Some(created_at),
        score: hit.score,
    }
}
