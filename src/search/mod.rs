//! Federated full-text search over the review content types
//!
//! Every content type (documents, comments, suggestions, discussions,
//! discussion messages) lives in its own shard. A search fans out to the
//! shards selected by the request, then merges, ranks, facets and pages
//! the combined hits.
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │        SearchService         │   │        IndexMaintainer       │
//! │  escape → plan → fan-out     │   │  upsert / remove / reindex   │
//! │  merge → rank → facets       │   │  rebuild_all (exclusive)     │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │          TextIndex trait         │
//!                ▼                                  ▼
//! ┌────────────────────────────────────────────────────────────────┐
//! │                     TantivyTextIndex                           │
//! │  documents │ comments │ suggestions │ discussions │ messages   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Non-phrase queries are quoted whole, so `database error` matches the
//! exact phrase, not both words independently.
//!
//! # Example
//!
//! ```no_run
//! use review_search::models::{SearchFilters, SearchRequest, TypeFilter};
//! use review_search::search::SearchService;
//!
//! async fn find(service: &SearchService) -> Result<(), Box<dyn std::error::Error>> {
//!     let request = SearchRequest::new("rollback plan")
//!         .with_filters(SearchFilters {
//!             content_type: TypeFilter::Discussions,
//!             ..Default::default()
//!         })
//!         .with_page(0, 20);
//!
//!     let response = service.execute(&request).await?;
//!     println!("{} hits", response.total);
//!     Ok(())
//! }
//! ```

mod config;
mod document;
mod error;
mod index;
mod maintainer;
mod query;
mod ranking;
mod service;

pub use config::{SearchConfig, SearchConfigBuilder};
pub use document::{build_shard_schema, ShardSchema};
pub use error::{Result, SearchError};
pub use index::{IndexHit, Predicate, ShardQuery, TantivyTextIndex, TextIndex};
pub use maintainer::{IndexMaintainer, RebuildCounts, ShardStats};
pub use query::{escape_query, is_empty_phrase, plan_shard_queries, shard_predicates, EMPTY_PHRASE};
pub use ranking::{compare, compute_facets, paginate, rank, TOP_AUTHORS};
pub use service::SearchService;
