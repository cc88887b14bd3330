use crate::error::AppError;

pub type SuggestionResult<T> = std::result::Result<T, SuggestionError>;

#[derive(Debug, thiserror::Error)]
pub enum SuggestionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<SuggestionError> for AppError {
    fn from(err: SuggestionError) -> Self {
        match err {
            SuggestionError::InvalidInput(msg) => AppError::Validation(msg),
        }
    }
}
