//! Error types for search operations

use crate::error::AppError;
use crate::models::ContentType;

/// Result type for search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during indexing and searching
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Request rejected before touching any shard
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single-row write failed
    #[error("Failed to index {content_type} {id}: {reason}")]
    IndexWrite {
        content_type: ContentType,
        id: String,
        reason: String,
    },

    /// A full rebuild was aborted; shards may be partially rebuilt
    #[error("Reindex failed: {0}")]
    Reindex(String),

    /// Query-time failure; the cause is logged, never returned
    #[error("Search failed")]
    ExecutionFailed,

    /// Raw failure reported by the text index
    #[error("Index error: {0}")]
    Index(String),

    /// Index initialization failed
    #[error("Index initialization failed: {0}")]
    IndexInitFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    pub(crate) fn write(content_type: ContentType, id: &str, reason: impl ToString) -> Self {
        SearchError::IndexWrite {
            content_type,
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<tantivy::TantivyError> for SearchError {
    fn from(err: tantivy::TantivyError) -> Self {
        SearchError::Index(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for SearchError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        SearchError::Index(format!("query parsing failed: {}", err))
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::InvalidInput(msg) => AppError::Validation(msg),
            SearchError::IndexWrite { .. } | SearchError::Reindex(_) => {
                AppError::Indexing(err.to_string())
            }
            SearchError::ExecutionFailed => AppError::SearchUnavailable,
            SearchError::IndexInitFailed(msg) => AppError::Configuration(msg),
            SearchError::Io(err) => AppError::Io(err),
            SearchError::Index(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_write_error_names_type_and_id() {
        let err = SearchError::write(ContentType::Comment, "c-42", "disk full");
        assert_eq!(err.to_string(), "Failed to index comment c-42: disk full");

        let app: AppError = err.into();
        assert_eq!(app.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_execution_failure_maps_to_opaque_app_error() {
        let app: AppError = SearchError::ExecutionFailed.into();
        assert!(matches!(app, AppError::SearchUnavailable));

        let app: AppError = SearchError::InvalidInput("query too long".into()).into();
        assert_eq!(app.status_code(), StatusCode::BAD_REQUEST);
    }
}
