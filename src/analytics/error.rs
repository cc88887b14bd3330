//! Error types for analytics operations

use crate::error::AppError;

/// Result type for analytics operations
pub type AnalyticsResult<T> = std::result::Result<T, AnalyticsError>;

/// Errors that can occur in analytics operations
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Caller-supplied value out of range
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown search id, user or query
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<sled::Error> for AnalyticsError {
    fn from(err: sled::Error) -> Self {
        AnalyticsError::Storage(err.to_string())
    }
}

impl From<bincode::Error> for AnalyticsError {
    fn from(err: bincode::Error) -> Self {
        AnalyticsError::Serialization(err.to_string())
    }
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::InvalidInput(msg) => AppError::Validation(msg),
            AnalyticsError::NotFound(msg) => AppError::NotFound(msg),
            AnalyticsError::Storage(msg) => AppError::Storage(msg),
            AnalyticsError::Serialization(msg) => AppError::Serialization(msg),
            AnalyticsError::InvalidConfiguration(msg) => AppError::Configuration(msg),
        }
    }
}
