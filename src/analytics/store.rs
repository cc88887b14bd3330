use crate::analytics::config::{AnalyticsConfig, StoreBackend};
use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::memory_store::InMemoryAnalyticsStore;
use crate::analytics::sled_store::SledAnalyticsStore;
use crate::models::{
    MetricsWindow, PopularQuery, SearchClick, SearchQueryLog, UserSearchHistoryEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Trait for analytics storage operations
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Persist a new query log row
    async fn insert_log(&self, log: &SearchQueryLog) -> AnalyticsResult<()>;

    /// Overwrite the click fields of a logged search
    async fn record_click(&self, click: &SearchClick) -> AnalyticsResult<()>;

    /// Query logs, optionally restricted to a window
    async fn logs(&self, window: Option<&MetricsWindow>) -> AnalyticsResult<Vec<SearchQueryLog>>;

    /// Delete query logs created before `cutoff`; returns how many were removed
    async fn delete_logs_before(&self, cutoff: DateTime<Utc>) -> AnalyticsResult<u64>;

    /// Fold one occurrence into the popular-query aggregate, atomically per query string
    async fn record_popular(
        &self,
        query: &str,
        result_count: u64,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<PopularQuery>;

    /// All popular-query aggregates, unordered
    async fn popular_queries(&self) -> AnalyticsResult<Vec<PopularQuery>>;

    /// Append to a user's history and prune it to `cap` rows in the same operation
    async fn push_history(&self, entry: &UserSearchHistoryEntry, cap: usize)
        -> AnalyticsResult<()>;

    /// A user's history, newest first
    async fn history(&self, user_id: &str, limit: usize)
        -> AnalyticsResult<Vec<UserSearchHistoryEntry>>;
}

/// Create an analytics store based on configuration
pub fn create_analytics_store(config: &AnalyticsConfig) -> AnalyticsResult<Arc<dyn AnalyticsStore>> {
    match config.backend {
        StoreBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AnalyticsError::InvalidConfiguration(
                    "Sled backend requires 'path' configuration".to_string(),
                )
            })?;

            tracing::info!(path = ?path, "Initializing Sled analytics store");
            Ok(Arc::new(SledAnalyticsStore::open(path)?))
        }
        StoreBackend::Memory => {
            tracing::info!("Initializing in-memory analytics store");
            Ok(Arc::new(InMemoryAnalyticsStore::new()))
        }
    }
}
