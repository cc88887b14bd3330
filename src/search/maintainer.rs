//! Keeps the shards in sync with canonical records

use crate::catalog::{CanonicalRecord, ContentSource};
use crate::metrics::INDEX_WRITES_TOTAL;
use crate::models::{ContentType, IndexedRecord};
use crate::search::error::{Result, SearchError};
use crate::search::index::TextIndex;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Rows written per shard by a rebuild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildCounts {
    pub documents: usize,
    pub comments: usize,
    pub suggestions: usize,
    pub discussions: usize,
    pub messages: usize,
}

impl RebuildCounts {
    fn set(&mut self, content_type: ContentType, count: usize) {
        match content_type {
            ContentType::Document => self.documents = count,
            ContentType::Comment => self.comments = count,
            ContentType::Suggestion => self.suggestions = count,
            ContentType::Discussion => self.discussions = count,
            ContentType::Message => self.messages = count,
        }
    }
}

/// Live rows per shard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardStats {
    pub rows: BTreeMap<ContentType, u64>,
}

/// Writes rows into the text index.
///
/// Writes to the same `(type, id)` are serialized through striped locks.
/// `rebuild_all` holds the rebuild lock exclusively, single-row writes hold
/// it shared, so no upsert interleaves with a rebuild.
pub struct IndexMaintainer {
    index: Arc<dyn TextIndex>,
    source: Arc<dyn ContentSource>,
    key_locks: Vec<Mutex<()>>,
    rebuild_lock: RwLock<()>,
}

impl IndexMaintainer {
    pub fn new(index: Arc<dyn TextIndex>, source: Arc<dyn ContentSource>, stripes: usize) -> Self {
        Self {
            index,
            source,
            key_locks: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
            rebuild_lock: RwLock::new(()),
        }
    }

    fn key_lock(&self, content_type: ContentType, id: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        content_type.hash(&mut hasher);
        id.hash(&mut hasher);
        let stripe = (hasher.finish() % self.key_locks.len() as u64) as usize;
        &self.key_locks[stripe]
    }

    /// Replace the row for `(content_type, record.id)`
    pub async fn upsert(&self, content_type: ContentType, record: IndexedRecord) -> Result<()> {
        if record.content_type != content_type {
            return Err(SearchError::InvalidInput(format!(
                "record {} is a {}, not a {}",
                record.id, record.content_type, content_type
            )));
        }
        if record.id.trim().is_empty() {
            return Err(SearchError::InvalidInput("record id is empty".to_string()));
        }

        let _rebuild = self.rebuild_lock.read().await;
        let _key = self.key_lock(content_type, &record.id).lock().await;

        let record_id = record.id.clone();
        let result = self
            .index
            .upsert(&record.for_shard())
            .await
            .map_err(|e| match e {
                err @ SearchError::IndexWrite { .. } => err,
                other => SearchError::write(content_type, &record_id, other),
            });
        self.observe_write(content_type, "upsert", &result);
        result
    }

    /// Remove the row for `(content_type, id)`
    pub async fn remove(&self, content_type: ContentType, id: &str) -> Result<()> {
        let _rebuild = self.rebuild_lock.read().await;
        let _key = self.key_lock(content_type, id).lock().await;

        let result = self
            .index
            .delete(content_type, id)
            .await
            .map_err(|e| match e {
                err @ SearchError::IndexWrite { .. } => err,
                other => SearchError::write(content_type, id, other),
            });
        self.observe_write(content_type, "remove", &result);
        result
    }

    /// Re-derive one row from canonical storage.
    ///
    /// A missing or soft-deleted record (or a message whose discussion is
    /// gone) is removed from its shard.
    pub async fn reindex_record(&self, content_type: ContentType, id: &str) -> Result<()> {
        let record = self
            .source
            .record(content_type, id)
            .await
            .map_err(|e| SearchError::write(content_type, id, e))?;

        let row = match record {
            Some(record) if !record.is_deleted() => {
                let parent = match (content_type, record.discussion_id.as_deref()) {
                    (ContentType::Message, Some(discussion_id)) => self
                        .source
                        .record(ContentType::Discussion, discussion_id)
                        .await
                        .map_err(|e| SearchError::write(content_type, id, e))?,
                    _ => None,
                };
                let authors = self.author_names().await.map_err(|e| SearchError::write(content_type, id, e))?;
                to_indexed(&record, parent.as_ref(), &authors)
            }
            _ => None,
        };

        match row {
            Some(row) => self.upsert(content_type, row).await,
            None => self.remove(content_type, id).await,
        }
    }

    /// Clear every shard and re-derive all rows from canonical storage.
    ///
    /// Any failure aborts the rebuild; shards already cleared stay as they are.
    pub async fn rebuild_all(&self) -> Result<RebuildCounts> {
        let _rebuild = self.rebuild_lock.write().await;
        let started = std::time::Instant::now();
        tracing::info!("Rebuilding all search shards");

        let result = self.rebuild_locked().await;
        match result {
            Ok(counts) => {
                tracing::info!(
                    documents = counts.documents,
                    comments = counts.comments,
                    suggestions = counts.suggestions,
                    discussions = counts.discussions,
                    messages = counts.messages,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Search shards rebuilt"
                );
                Ok(counts)
            }
            Err(e) => {
                tracing::error!(error = %e, "Search shard rebuild aborted");
                Err(match e {
                    err @ SearchError::Reindex(_) => err,
                    other => SearchError::Reindex(other.to_string()),
                })
            }
        }
    }

    async fn rebuild_locked(&self) -> Result<RebuildCounts> {
        let authors = self
            .author_names()
            .await
            .map_err(|e| SearchError::Reindex(e.to_string()))?;

        for content_type in ContentType::ALL {
            self.index.clear(content_type).await?;
        }

        // Live discussions, for message paths and orphan detection
        let discussions: HashMap<String, CanonicalRecord> = self
            .source
            .records(ContentType::Discussion)
            .await
            .map_err(|e| SearchError::Reindex(e.to_string()))?
            .into_iter()
            .filter(|d| !d.is_deleted())
            .map(|d| (d.id.clone(), d))
            .collect();

        let mut counts = RebuildCounts::default();
        for content_type in ContentType::ALL {
            let records = self
                .source
                .records(content_type)
                .await
                .map_err(|e| SearchError::Reindex(e.to_string()))?;

            let rows: Vec<IndexedRecord> = records
                .iter()
                .filter(|record| !record.is_deleted())
                .filter_map(|record| {
                    let parent = record
                        .discussion_id
                        .as_ref()
                        .and_then(|id| discussions.get(id));
                    to_indexed(record, parent, &authors)
                })
                .map(IndexedRecord::for_shard)
                .collect();

            let written = self.index.insert_batch(content_type, &rows).await?;
            tracing::debug!(shard = content_type.shard_name(), rows = written, "Shard rebuilt");
            counts.set(content_type, written);
        }

        Ok(counts)
    }

    /// Live rows per shard
    pub async fn stats(&self) -> Result<ShardStats> {
        let mut stats = ShardStats::default();
        for content_type in ContentType::ALL {
            stats
                .rows
                .insert(content_type, self.index.count(content_type).await?);
        }
        Ok(stats)
    }

    async fn author_names(&self) -> crate::error::Result<HashMap<String, String>> {
        Ok(self
            .source
            .users()
            .await?
            .into_iter()
            .map(|user| (user.id, user.name))
            .collect())
    }

    fn observe_write(&self, content_type: ContentType, op: &str, result: &Result<()>) {
        let outcome = if result.is_ok() { "ok" } else { "error" };
        INDEX_WRITES_TOTAL
            .with_label_values(&[content_type.as_ref(), op, outcome])
            .inc();
        if let Err(ref e) = result {
            tracing::error!(content_type = %content_type, op = op, error = %e, "Index write failed");
        }
    }
}

/// Derive a row from a canonical record.
///
/// Messages take their path from the parent discussion and are skipped when
/// it is missing.
fn to_indexed(
    record: &CanonicalRecord,
    parent: Option<&CanonicalRecord>,
    authors: &HashMap<String, String>,
) -> Option<IndexedRecord> {
    let doc_path = match record.content_type {
        ContentType::Message => {
            let parent = parent.filter(|p| !p.is_deleted())?;
            parent.doc_path.clone()?
        }
        _ => record.doc_path.clone()?,
    };

    Some(IndexedRecord {
        id: record.id.clone(),
        content_type: record.content_type,
        doc_path,
        parent_id: record.discussion_id.clone(),
        title: record.title.clone(),
        content: record.content.clone(),
        user_id: record.user_id.clone(),
        author_name: record
            .user_id
            .as_ref()
            .and_then(|user_id| authors.get(user_id).cloned()),
        status: record.status.clone(),
        resolved: record.resolved,
        created_at: record.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn canonical(content_type: ContentType, id: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.to_string(),
            content_type,
            doc_path: Some("/guide.md".to_string()),
            discussion_id: None,
            title: None,
            content: "body".to_string(),
            user_id: Some("u1".to_string()),
            status: None,
            resolved: None,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_message_inherits_discussion_path() {
        let mut discussion = canonical(ContentType::Discussion, "t1");
        discussion.doc_path = Some("/spec.md".to_string());
        let mut message = canonical(ContentType::Message, "m1");
        message.doc_path = None;
        message.discussion_id = Some("t1".to_string());

        let authors = HashMap::from([("u1".to_string(), "Ada".to_string())]);
        let row = to_indexed(&message, Some(&discussion), &authors).unwrap();
        assert_eq!(row.doc_path, "/spec.md");
        assert_eq!(row.parent_id.as_deref(), Some("t1"));
        assert_eq!(row.author_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_orphan_message_is_skipped() {
        let mut message = canonical(ContentType::Message, "m1");
        message.discussion_id = Some("gone".to_string());
        assert!(to_indexed(&message, None, &HashMap::new()).is_none());

        let mut deleted = canonical(ContentType::Discussion, "gone");
        deleted.deleted_at = Some(Utc::now());
        assert!(to_indexed(&message, Some(&deleted), &HashMap::new()).is_none());
    }

    #[test]
    fn test_rebuild_counts_by_type() {
        let mut counts = RebuildCounts::default();
        counts.set(ContentType::Comment, 3);
        counts.set(ContentType::Message, 2);
        assert_eq!(counts.comments, 3);
        assert_eq!(counts.messages, 2);
        assert_eq!(counts.documents, 0);
    }
}
