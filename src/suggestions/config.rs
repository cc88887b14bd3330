use serde::{Deserialize, Serialize};

/// Configuration for autocomplete
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionsConfig {
    /// Suggestions returned when the caller gives no limit
    pub default_limit: usize,

    /// Upper bound on a requested limit
    pub max_limit: usize,

    /// Shorter input yields no suggestions
    pub min_query_length: usize,

    /// Longer input is rejected
    pub max_query_length: usize,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 20,
            min_query_length: 2,
            max_query_length: 100,
        }
    }
}
