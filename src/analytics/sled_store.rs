use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::store::AnalyticsStore;
use crate::models::{
    MetricsWindow, PopularQuery, SearchClick, SearchQueryLog, UserSearchHistoryEntry,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Persistent analytics store using the Sled embedded database
#[derive(Clone)]
pub struct SledAnalyticsStore {
    db: Arc<Db>,
    logs_tree: sled::Tree,
    popular_tree: sled::Tree,
    history_tree: sled::Tree,
    /// Serializes append-and-prune of history rows
    history_lock: Arc<Mutex<()>>,
}

impl SledAnalyticsStore {
    /// Open (or create) a store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> AnalyticsResult<Self> {
        let db = sled::open(path.as_ref()).map_err(|e| {
            AnalyticsError::Storage(format!("Failed to open Sled database: {}", e))
        })?;

        let logs_tree = db.open_tree("search_logs")?;
        let popular_tree = db.open_tree("popular_queries")?;
        let history_tree = db.open_tree("search_history")?;

        tracing::info!("Initialized Sled analytics store at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            logs_tree,
            popular_tree,
            history_tree,
            history_lock: Arc::new(Mutex::new(())),
        })
    }

    fn encode<T: Serialize>(value: &T) -> AnalyticsResult<Vec<u8>> {
        Ok(bincode::serialize(value)?)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> AnalyticsResult<T> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// History keys are `user_id \0 sequence`, so a prefix scan yields one
    /// user's rows oldest first
    fn history_prefix(user_id: &str) -> Vec<u8> {
        let mut prefix = user_id.as_bytes().to_vec();
        prefix.push(0);
        prefix
    }

    fn history_key(&self, user_id: &str) -> AnalyticsResult<Vec<u8>> {
        let mut key = Self::history_prefix(user_id);
        key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());
        Ok(key)
    }
}

#[async_trait]
impl AnalyticsStore for SledAnalyticsStore {
    async fn insert_log(&self, log: &SearchQueryLog) -> AnalyticsResult<()> {
        self.logs_tree.insert(log.id.as_bytes(), Self::encode(log)?)?;
        Ok(())
    }

    async fn record_click(&self, click: &SearchClick) -> AnalyticsResult<()> {
        let key = click.search_id.as_bytes();
        let bytes = self
            .logs_tree
            .get(key)?
            .ok_or_else(|| AnalyticsError::NotFound(format!("Search {} not found", click.search_id)))?;

        let mut log: SearchQueryLog = Self::decode(&bytes)?;
        log.clicked_result_id = Some(click.result_id.clone());
        log.clicked_result_type = Some(click.result_type.clone());
        log.clicked_result_rank = Some(click.result_rank);

        self.logs_tree.insert(key, Self::encode(&log)?)?;
        Ok(())
    }

    async fn logs(&self, window: Option<&MetricsWindow>) -> AnalyticsResult<Vec<SearchQueryLog>> {
        let mut logs = Vec::new();
        for item in self.logs_tree.iter() {
            let (_, value) = item?;
            let log: SearchQueryLog = Self::decode(&value)?;
            if window.map_or(true, |w| w.contains(log.created_at)) {
                logs.push(log);
            }
        }
        Ok(logs)
    }

    async fn delete_logs_before(&self, cutoff: DateTime<Utc>) -> AnalyticsResult<u64> {
        let mut deleted = 0;
        for item in self.logs_tree.iter() {
            let (key, value) = item?;
            let log: SearchQueryLog = Self::decode(&value)?;
            if log.created_at < cutoff && self.logs_tree.remove(key)?.is_some() {
                deleted += 1;
            }
        }
        self.logs_tree.flush_async().await?;
        Ok(deleted)
    }

    async fn record_popular(
        &self,
        query: &str,
        result_count: u64,
        at: DateTime<Utc>,
    ) -> AnalyticsResult<PopularQuery> {
        let key = query.as_bytes();

        // Compare-and-swap retry loop: concurrent increments never overwrite each other
        loop {
            let current = self.popular_tree.get(key)?;
            let updated = match current {
                Some(ref bytes) => {
                    let mut popular: PopularQuery = Self::decode(bytes)?;
                    popular.record(result_count, at);
                    popular
                }
                None => PopularQuery::first(query, result_count, at),
            };

            let swapped = self.popular_tree.compare_and_swap(
                key,
                current,
                Some(Self::encode(&updated)?),
            )?;
            if swapped.is_ok() {
                return Ok(updated);
            }
        }
    }

    async fn popular_queries(&self) -> AnalyticsResult<Vec<PopularQuery>> {
        self.popular_tree
            .iter()
            .values()
            .map(|value| -> AnalyticsResult<PopularQuery> { Self::decode(&value?) })
            .collect()
    }

    async fn push_history(
        &self,
        entry: &UserSearchHistoryEntry,
        cap: usize,
    ) -> AnalyticsResult<()> {
        let prefix = Self::history_prefix(&entry.user_id);
        let _guard = self.history_lock.lock();

        self.history_tree
            .insert(self.history_key(&entry.user_id)?, Self::encode(entry)?)?;

        let keys = self
            .history_tree
            .scan_prefix(&prefix)
            .keys()
            .collect::<Result<Vec<_>, sled::Error>>()?;
        if keys.len() > cap {
            let mut batch = sled::Batch::default();
            for key in &keys[..keys.len() - cap] {
                batch.remove(key.clone());
            }
            self.history_tree.apply_batch(batch)?;
        }
        Ok(())
    }

    async fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> AnalyticsResult<Vec<UserSearchHistoryEntry>> {
        self.history_tree
            .scan_prefix(Self::history_prefix(user_id))
            .values()
            .rev()
            .take(limit)
            .map(|value| -> AnalyticsResult<UserSearchHistoryEntry> { Self::decode(&value?) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_popular_aggregate_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = SledAnalyticsStore::open(temp_dir.path()).unwrap();
            store.record_popular("widget", 4, Utc::now()).await.unwrap();
            store.record_popular("widget", 8, Utc::now()).await.unwrap();
            store.db.flush().unwrap();
        }

        let store = SledAnalyticsStore::open(temp_dir.path()).unwrap();
        let popular = store.popular_queries().await.unwrap();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].search_count, 2);
        assert!((popular[0].avg_result_count - 6.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_history_prefixes_do_not_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledAnalyticsStore::open(temp_dir.path()).unwrap();

        store
            .push_history(&UserSearchHistoryEntry::new("u1", "alpha", None, 1), 100)
            .await
            .unwrap();
        store
            .push_history(&UserSearchHistoryEntry::new("u10", "beta", None, 1), 100)
            .await
            .unwrap();

        let rows = store.history("u1", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].query, "alpha");
    }

    #[tokio::test]
    async fn test_delete_logs_before_cutoff() {
        let temp_dir = TempDir::new().unwrap();
        let store = SledAnalyticsStore::open(temp_dir.path()).unwrap();
        let now = Utc::now();

        for (query, age_days) in [("old", 40), ("recent", 1)] {
            let log = SearchQueryLog {
                id: uuid::Uuid::now_v7(),
                user_id: None,
                session_id: None,
                query: query.into(),
                query_type: "all".into(),
                filters: None,
                result_count: 1,
                clicked_result_id: None,
                clicked_result_type: None,
                clicked_result_rank: None,
                response_time_ms: 5,
                created_at: now - chrono::Duration::days(age_days),
            };
            store.insert_log(&log).await.unwrap();
        }

        let deleted = store
            .delete_logs_before(now - chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.logs(None).await.unwrap()[0].query, "recent");
    }
}
