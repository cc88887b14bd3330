//! Shared test doubles

use async_trait::async_trait;
use review_search::models::{ContentType, IndexedRecord};
use review_search::search::{IndexHit, Result, SearchError, ShardQuery, TextIndex};
use std::sync::Arc;

/// Which `TextIndex` calls should fail
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Searches against this shard fail
    pub search: Option<ContentType>,
    /// Single-row upserts and deletes fail
    pub writes: bool,
    /// Batch inserts fail, after the shard has been cleared
    pub batches: bool,
}

/// Wraps a real index and fails selected calls with a raw index error
pub struct FaultyIndex {
    inner: Arc<dyn TextIndex>,
    faults: Faults,
}

impl FaultyIndex {
    pub fn new(inner: Arc<dyn TextIndex>, faults: Faults) -> Self {
        Self { inner, faults }
    }

    fn failure(what: &str) -> SearchError {
        SearchError::Index(format!("{} failed: disk unavailable", what))
    }
}

#[async_trait]
impl TextIndex for FaultyIndex {
    async fn upsert(&self, record: &IndexedRecord) -> Result<()> {
        if self.faults.writes {
            return Err(Self::failure("upsert"));
        }
        self.inner.upsert(record).await
    }

    async fn delete(&self, content_type: ContentType, id: &str) -> Result<()> {
        if self.faults.writes {
            return Err(Self::failure("delete"));
        }
        self.inner.delete(content_type, id).await
    }

    async fn clear(&self, content_type: ContentType) -> Result<()> {
        self.inner.clear(content_type).await
    }

    async fn insert_batch(
        &self,
        content_type: ContentType,
        records: &[IndexedRecord],
    ) -> Result<usize> {
        if self.faults.batches {
            return Err(Self::failure("batch insert"));
        }
        self.inner.insert_batch(content_type, records).await
    }

    async fn search(&self, content_type: ContentType, query: &ShardQuery) -> Result<Vec<IndexHit>> {
        if self.faults.search == Some(content_type) {
            return Err(Self::failure("search"));
        }
        self.inner.search(content_type, query).await
    }

    async fn count(&self, content_type: ContentType) -> Result<u64> {
        self.inner.count(content_type).await
    }
}
