use crate::catalog::{AuthorMatch, CanonicalRecord, ContentSource, UserRecord};
use crate::error::{AppError, Result};
use crate::models::ContentType;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Serialized form of a catalog, as loaded from disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub records: Vec<CanonicalRecord>,
}

/// In-memory read model (development, tests, and snapshot-driven deployments)
#[derive(Clone, Default)]
pub struct InMemoryContentSource {
    records: Arc<DashMap<(ContentType, String), CanonicalRecord>>,
    users: Arc<DashMap<String, UserRecord>>,
}

impl InMemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let source = Self::new();
        for user in snapshot.users {
            source.put_user(user);
        }
        for record in snapshot.records {
            source.put(record);
        }
        source
    }

    /// Load a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::Configuration(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let snapshot: CatalogSnapshot = serde_json::from_slice(&bytes)?;

        tracing::info!(
            path = %path.display(),
            users = snapshot.users.len(),
            records = snapshot.records.len(),
            "Loaded catalog snapshot"
        );

        Ok(Self::from_snapshot(snapshot))
    }

    /// Insert or replace a record
    pub fn put(&self, record: CanonicalRecord) {
        self.records
            .insert((record.content_type, record.id.clone()), record);
    }

    pub fn put_user(&self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }

    /// Mark a record soft-deleted; returns false if it does not exist
    pub fn soft_delete(&self, content_type: ContentType, id: &str) -> bool {
        match self.records.get_mut(&(content_type, id.to_string())) {
            Some(mut record) => {
                record.deleted_at = Some(chrono::Utc::now());
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ContentSource for InMemoryContentSource {
    async fn records(&self, content_type: ContentType) -> Result<Vec<CanonicalRecord>> {
        let mut records: Vec<CanonicalRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == content_type)
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn record(&self, content_type: ContentType, id: &str) -> Result<Option<CanonicalRecord>> {
        Ok(self
            .records
            .get(&(content_type, id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn users(&self) -> Result<Vec<UserRecord>> {
        Ok(self.users.iter().map(|entry| entry.value().clone()).collect())
    }

    async fn document_titles_matching(&self, fragment: &str) -> Result<Vec<String>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.content_type == ContentType::Document && !entry.is_deleted())
            .filter_map(|entry| entry.title.clone())
            .filter(|title| title.to_lowercase().contains(&needle))
            .collect())
    }

    async fn authors_matching(&self, fragment: &str) -> Result<Vec<AuthorMatch>> {
        let needle = fragment.to_lowercase();

        let mut comment_counts: HashMap<String, u64> = HashMap::new();
        for entry in self.records.iter() {
            if entry.content_type != ContentType::Comment || entry.is_deleted() {
                continue;
            }
            if let Some(ref user_id) = entry.user_id {
                *comment_counts.entry(user_id.clone()).or_insert(0) += 1;
            }
        }

        Ok(self
            .users
            .iter()
            .filter(|user| user.name.to_lowercase().contains(&needle))
            .map(|user| AuthorMatch {
                name: user.name.clone(),
                comment_count: comment_counts.get(&user.id).copied().unwrap_or(0),
            })
            .collect())
    }
}
