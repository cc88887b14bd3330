use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::store::AnalyticsStore;
use crate::models::{
    MetricsWindow, PopularQuery, SearchClick, SearchQueryLog, UserSearchHistoryEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory analytics store (development and tests)
#[derive(Clone, Default)]
pub struct InMemoryAnalyticsStore {
    logs: Arc<DashMap<Uuid, SearchQueryLog>>,
    popular: Arc<DashMap<String, PopularQuery>>,
    /// Per-user history, oldest first
    history: Arc<DashMap<String, Vec<UserSearchHistoryEntry>>>,
}

impl InMemoryAnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryAnalyticsStore {
    async fn insert_log(&self, log: &SearchQueryLog) -> AnalyticsResult<()> {
        self.logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn record_click(&self, click: &SearchClick) -> AnalyticsResult<()> {
        let mut log = self
            .logs
            .get_mut(&click.search_id)
            .ok_or_else(|| AnalyticsError::NotFound(format!("Search {} not found", click.search_id)))?;

        log.clicked_result_id = Some(click.result_id.clone());
        log.clicked_result_type = Some(click.result_type.clone());
        log.clicked_result_rank = Some(click.result_rank);
        Ok(())
    }

    async fn logs(&self, window: Option<&MetricsWindow>) -> AnalyticsResult<Vec<SearchQueryLog>> {
        Ok(self
            .logs
            .iter()
            .filter(|entry| window.map_or(true, |w| w.contains(entry.created_at)))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_logs_before(&self, cutoff: DateTime<Utc>) -> AnalyticsResult<u64> {
        let mut deleted = 0u64;
        self.logs.retain(|_, log| {
            let keep = log.created_at >= cutoff;
            if !keep {
                deleted += 1;
            }
            keep
        });
        Ok(deleted)
    }

    async fn record_popular(
        &self,
        query: &str,
        result_count: u64,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<PopularQuery> {
        // The entry guard holds the shard lock for the whole read-modify-write
        let entry = self
            .popular
            .entry(query.to_string())
            .and_modify(|popular| popular.record(result_count, at))
            .or_insert_with(|| PopularQuery::first(query, result_count, at));
        Ok(entry.value().clone())
    }

    async fn popular_queries(&self) -> AnalyticsResult<Vec<PopularQuery>> {
        Ok(self.popular.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn push_history(
        &self,
        entry: &UserSearchHistoryEntry,
        cap: usize,
    ) -> AnalyticsResult<()> {
        let mut rows = self.history.entry(entry.user_id.clone()).or_default();
        rows.push(entry.clone());
        if rows.len() > cap {
            let excess = rows.len() - cap;
            rows.drain(..excess);
        }
        Ok(())
    }

    async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> AnalyticsResult<Vec<UserSearchHistoryEntry>> {
        Ok(self
            .history
            .get(user_id)
            .map(|rows| rows.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_click_on_unknown_search_is_not_found() {
        let store = InMemoryAnalyticsStore::new();
        let click = SearchClick {
            search_id: Uuid::now_v7(),
            result_id: "c1".into(),
            result_type: "comment".into(),
            result_rank: 1,
        };

        assert!(matches!(
            store.record_click(&click).await,
            Err(AnalyticsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let store = InMemoryAnalyticsStore::new();
        for i in 0..5 {
            let entry = UserSearchHistoryEntry::new("u1", format!("q{}", i), None, 1);
            store.push_history(&entry, 3).await.unwrap();
        }

        let rows = store.history("u1", 10).await.unwrap();
        let queries: Vec<&str> = rows.iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["q4", "q3", "q2"]);
    }

    fn log_at(created_at: DateTime<Utc>) -> SearchQueryLog {
        SearchQueryLog {
            id: Uuid::now_v7(),
            user_id: None,
            session_id: None,
            query: "q".into(),
            query_type: "all".into(),
            filters: None,
            result_count: 0,
            clicked_result_id: None,
            clicked_result_type: None,
            clicked_result_rank: None,
            response_time_ms: 1,
            created_at,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cleanup_counts_only_its_own_deletions_under_concurrent_inserts() {
        let store = InMemoryAnalyticsStore::new();
        let now = Utc::now();
        for _ in 0..200 {
            store.insert_log(&log_at(now - chrono::Duration::days(30))).await.unwrap();
        }

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..500 {
                    store.insert_log(&log_at(Utc::now())).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        let deleted = store
            .delete_logs_before(now - chrono::Duration::days(1))
            .await
            .unwrap();
        writer.await.unwrap();

        assert_eq!(deleted, 200);
        assert_eq!(store.logs(None).await.unwrap().len(), 500);
    }
}
