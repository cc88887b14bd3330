use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One executed query, created once and updated at most once more by a click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryLog {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub query: String,
    pub query_type: String,
    /// Filters as a JSON string
    pub filters: Option<String>,
    pub result_count: u64,
    pub clicked_result_id: Option<String>,
    pub clicked_result_type: Option<String>,
    pub clicked_result_rank: Option<u32>,
    pub response_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl SearchQueryLog {
    pub fn was_clicked(&self) -> bool {
        self.clicked_result_id.is_some()
    }
}

/// Input of `AnalyticsRecorder::log_search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSearchLog {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub query: String,
    pub query_type: String,
    pub filters: Option<String>,
    pub result_count: u64,
    pub response_time_ms: u64,
}

/// A click on one result of a logged search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchClick {
    pub search_id: Uuid,
    pub result_id: String,
    pub result_type: String,
    pub result_rank: u32,
}

/// Running aggregate for one distinct query string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularQuery {
    pub id: Uuid,
    pub query: String,
    pub search_count: u64,
    pub avg_result_count: f64,
    pub last_searched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PopularQuery {
    /// First occurrence of a query string
    pub fn first(query: &str, result_count: u64, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            query: query.to_string(),
            search_count: 1,
            avg_result_count: result_count as f64,
            last_searched_at: at,
            updated_at: at,
        }
    }

    /// Fold one more occurrence into the streaming mean
    pub fn record(&mut self, result_count: u64, at: DateTime<Utc>) {
        let old_count = self.search_count as f64;
        self.search_count += 1;
        self.avg_result_count =
            (self.avg_result_count * old_count + result_count as f64) / self.search_count as f64;
        if at > self.last_searched_at {
            self.last_searched_at = at;
        }
        self.updated_at = at;
    }
}

/// A query remembered in one user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSearchHistoryEntry {
    pub id: Uuid,
    pub user_id: String,
    pub query: String,
    pub filters: Option<String>,
    pub result_count: u64,
    pub created_at: DateTime<Utc>,
}

impl UserSearchHistoryEntry {
    pub fn new(
        user_id: impl Into<String>,
        query: impl Into<String>,
        filters: Option<String>,
        result_count: u64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: user_id.into(),
            query: query.into(),
            filters,
            result_count,
            created_at: Utc::now(),
        }
    }
}

/// Time range for dashboard metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricsWindow {
    pub fn last_days(days: u32) -> Self {
        let end = Utc::now();
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

/// Query string with its number of occurrences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCount {
    pub query: String,
    pub count: u64,
}

/// Dashboard metrics over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetrics {
    pub total_searches: u64,
    pub unique_users: u64,
    pub avg_result_count: f64,
    pub avg_response_time: f64,
    /// Percentage of searches with a reported click
    pub click_through_rate: f64,
    /// Percentage of searches that returned nothing
    pub no_results_rate: f64,
    pub top_queries: Vec<QueryCount>,
    pub top_no_results_queries: Vec<QueryCount>,
    pub searches_by_type: BTreeMap<String, u64>,
    /// Index is the hour of day in the reference timezone
    pub searches_by_hour: [u64; 24],
}

/// One individually slow query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowQuery {
    pub query: String,
    pub response_time_ms: u64,
    pub result_count: u64,
    pub created_at: DateTime<Utc>,
}

/// Response-time distribution over all recorded searches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub count: u64,
    pub avg_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub p99_ms: u64,
    pub slowest_queries: Vec<SlowQuery>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popular_query_streaming_mean() {
        let now = Utc::now();
        let mut popular = PopularQuery::first("widget", 4, now);
        popular.record(8, now);
        assert_eq!(popular.search_count, 2);
        assert!((popular.avg_result_count - 6.0).abs() < f64::EPSILON);

        popular.record(0, now);
        assert_eq!(popular.search_count, 3);
        assert!((popular.avg_result_count - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metrics_window_contains() {
        let window = MetricsWindow::last_days(1);
        assert!(window.contains(window.end - Duration::hours(2)));
        assert!(!window.contains(window.start - Duration::seconds(1)));
    }
}
