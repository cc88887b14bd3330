//! Read model over the canonical review entities.
//!
//! The search engine never owns documents, comments and the rest; it reads
//! them through [`ContentSource`] when rebuilding shards and when building
//! autocomplete candidates.

mod memory;

pub use memory::{CatalogSnapshot, InMemoryContentSource};

use crate::error::Result;
use crate::models::ContentType;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A canonical entity as stored by the review system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,

    #[serde(rename = "type")]
    pub content_type: ContentType,

    /// Absent for messages, which inherit their discussion's path
    #[serde(default)]
    pub doc_path: Option<String>,

    /// Parent discussion (messages only)
    #[serde(default)]
    pub discussion_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    pub content: String,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub resolved: Option<bool>,

    pub created_at: DateTime<Utc>,

    /// Soft-deletion marker
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CanonicalRecord {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Row of the user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
}

/// An author whose name matched a fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorMatch {
    pub name: String,
    /// Live comments written by this author
    pub comment_count: u64,
}

/// Typed accessors over canonical storage
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every record of a type, soft-deleted ones included
    async fn records(&self, content_type: ContentType) -> Result<Vec<CanonicalRecord>>;

    /// One record by id, soft-deleted or not
    async fn record(&self, content_type: ContentType, id: &str) -> Result<Option<CanonicalRecord>>;

    async fn users(&self) -> Result<Vec<UserRecord>>;

    /// Titles of live documents containing `fragment`, case-insensitively
    async fn document_titles_matching(&self, fragment: &str) -> Result<Vec<String>>;

    /// Authors whose name contains `fragment`, case-insensitively
    async fn authors_matching(&self, fragment: &str) -> Result<Vec<AuthorMatch>>;
}
