use crate::models::content::{ContentType, TypeFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default page size when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Filters of a search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Which shards to search
    #[serde(rename = "type", default)]
    pub content_type: TypeFilter,

    /// Restrict to rows authored by this user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Status predicate; for comments only `open` / `resolved` are meaningful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Comment resolution flag; `status` wins when both are set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,

    /// Restrict to one reviewed document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_path: Option<String>,

    /// Only rows created at or before this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,

    /// Only rows created at or after this instant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,
}

/// Who issued a search; used for analytics and history only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

/// A complete search request, built once by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw query text as typed by the user
    pub query: String,

    #[serde(default)]
    pub filters: SearchFilters,

    #[serde(default)]
    pub offset: usize,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub requester: Requester,
}

fn default_limit() -> usize {
    DEFAULT_PAGE_SIZE
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            filters: SearchFilters::default(),
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
            requester: Requester::default(),
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = requester;
        self
    }
}

/// One ranked hit, produced by the query engine and never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,

    #[serde(rename = "type")]
    pub content_type: ContentType,

    pub doc_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub content: String,

    /// Context window around the match, with matched terms in `<b>` tags
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Relevance score from the shard that produced the hit
    pub score: f32,
}

/// Author facet entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorFacet {
    pub id: Option<String>,
    pub name: String,
    pub count: usize,
}

/// Facet counts over the whole merged result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFacets {
    pub types: BTreeMap<ContentType, usize>,
    pub statuses: BTreeMap<String, usize>,
    pub authors: Vec<AuthorFacet>,
}

/// Search response with results and metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The requested page of results
    pub results: Vec<SearchResult>,

    /// Size of the merged result set before pagination
    pub total: usize,

    pub facets: SearchFacets,

    /// Offset used for pagination
    pub offset: usize,

    /// Effective (clamped) page size
    pub limit: usize,
}

impl SearchResponse {
    /// Response for a query that matched nothing without touching the index
    pub fn empty(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            ..Default::default()
        }
    }
}
