//! Query autocomplete
//!
//! Candidates come from four places, in priority order: queries other
//! people search for often, the caller's own recent searches, document
//! titles, and comment authors (offered as `author:<name>`).

mod config;
mod engine;
mod error;

pub use config::SuggestionsConfig;
pub use engine::{dedupe, rank_candidates, Candidate, SuggestionEngine, SuggestionSource};
pub use error::{SuggestionError, SuggestionResult};
