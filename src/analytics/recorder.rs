//! Query analytics: logging, clicks, popular queries, history and dashboards

use crate::analytics::config::AnalyticsConfig;
use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::statistics::{compute_metrics, performance_stats};
use crate::analytics::store::AnalyticsStore;
use crate::models::{
    MetricsWindow, NewSearchLog, PerformanceStats, PopularQuery, SearchClick, SearchMetrics,
    SearchQueryLog, UserSearchHistoryEntry,
};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use uuid::Uuid;

/// Records searches and answers the admin dashboard
pub struct AnalyticsRecorder {
    store: Arc<dyn AnalyticsStore>,
    config: AnalyticsConfig,
    timezone: Tz,
}

impl AnalyticsRecorder {
    pub fn new(store: Arc<dyn AnalyticsStore>, config: AnalyticsConfig) -> AnalyticsResult<Self> {
        let timezone: Tz = config.timezone.parse().map_err(|e| {
            AnalyticsError::InvalidConfiguration(format!(
                "Unknown timezone '{}': {}",
                config.timezone, e
            ))
        })?;

        Ok(Self {
            store,
            config,
            timezone,
        })
    }

    /// Persist a query log row and fold it into the popular-query aggregate
    pub async fn log_search(&self, entry: NewSearchLog) -> AnalyticsResult<Uuid> {
        let now = Utc::now();
        let log = SearchQueryLog {
            id: Uuid::now_v7(),
            user_id: entry.user_id,
            session_id: entry.session_id,
            query: entry.query,
            query_type: entry.query_type,
            filters: entry.filters,
            result_count: entry.result_count,
            clicked_result_id: None,
            clicked_result_type: None,
            clicked_result_rank: None,
            response_time_ms: entry.response_time_ms,
            created_at: now,
        };

        self.store.insert_log(&log).await?;
        let popular = self
            .store
            .record_popular(&log.query, log.result_count, now)
            .await?;

        tracing::debug!(
            search_id = %log.id,
            query = %log.query,
            result_count = log.result_count,
            search_count = popular.search_count,
            "Search logged"
        );

        Ok(log.id)
    }

    /// Attach a clicked result to a logged search; later clicks overwrite
    pub async fn log_search_click(&self, click: &SearchClick) -> AnalyticsResult<()> {
        self.store.record_click(click).await?;
        tracing::debug!(
            search_id = %click.search_id,
            result_id = %click.result_id,
            rank = click.result_rank,
            "Search click logged"
        );
        Ok(())
    }

    pub async fn get_metrics(&self, window: MetricsWindow) -> AnalyticsResult<SearchMetrics> {
        if window.start > window.end {
            return Err(AnalyticsError::InvalidInput(
                "Metrics window starts after it ends".to_string(),
            ));
        }
        let logs = self.store.logs(Some(&window)).await?;
        Ok(compute_metrics(&logs, self.timezone, self.config.top_queries))
    }

    /// Popular queries by search count, then most recently searched
    pub async fn get_popular_searches(&self, limit: usize) -> AnalyticsResult<Vec<PopularQuery>> {
        let mut popular = self.store.popular_queries().await?;
        popular.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then_with(|| b.last_searched_at.cmp(&a.last_searched_at))
        });
        popular.truncate(limit);
        Ok(popular)
    }

    /// Response-time percentiles over every retained search
    pub async fn get_performance_stats(&self) -> AnalyticsResult<PerformanceStats> {
        let logs = self.store.logs(None).await?;
        Ok(performance_stats(&logs, self.config.slow_queries))
    }

    /// Remember a query in the user's history, keeping at most `history_cap` rows
    pub async fn save_user_search(
        &self,
        user_id: &str,
        query: &str,
        filters: Option<String>,
        result_count: u64,
    ) -> AnalyticsResult<()> {
        let entry = UserSearchHistoryEntry::new(user_id, query, filters, result_count);
        self.store.push_history(&entry, self.config.history_cap).await
    }

    /// A user's history, newest first
    pub async fn get_user_search_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> AnalyticsResult<Vec<UserSearchHistoryEntry>> {
        self.store
            .history(user_id, limit.min(self.config.history_cap))
            .await
    }

    /// Delete query logs older than `days_to_keep` days.
    ///
    /// Popular queries and user history are left alone.
    pub async fn clear_old_search_data(&self, days_to_keep: u32) -> AnalyticsResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_to_keep));
        let deleted = self.store.delete_logs_before(cutoff).await?;

        tracing::info!(
            days_to_keep = days_to_keep,
            deleted = deleted,
            "Cleared old search logs"
        );

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::memory_store::InMemoryAnalyticsStore;

    fn recorder() -> AnalyticsRecorder {
        AnalyticsRecorder::new(
            Arc::new(InMemoryAnalyticsStore::new()),
            AnalyticsConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let config = AnalyticsConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        let result = AnalyticsRecorder::new(Arc::new(InMemoryAnalyticsStore::new()), config);
        assert!(matches!(result, Err(AnalyticsError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_popular_ordering_breaks_ties_by_recency() {
        let recorder = recorder();
        for query in ["alpha", "beta", "beta"] {
            recorder
                .log_search(NewSearchLog {
                    query: query.to_string(),
                    query_type: "all".to_string(),
                    result_count: 1,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        recorder
            .log_search(NewSearchLog {
                query: "gamma".to_string(),
                query_type: "all".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let popular = recorder.get_popular_searches(10).await.unwrap();
        let queries: Vec<&str> = popular.iter().map(|p| p.query.as_str()).collect();
        assert_eq!(queries, vec!["beta", "gamma", "alpha"]);
    }
}
