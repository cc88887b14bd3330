//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Root directory for the shard indexes; each shard gets a subdirectory.
    /// `None` keeps every shard in RAM.
    pub index_path: Option<PathBuf>,

    /// Index writer heap size in bytes, per shard (tantivy needs at least 15MB per thread)
    pub writer_heap_size: usize,

    /// Number of indexing threads per shard writer
    pub indexing_threads: usize,

    /// Hard upper bound on the page size of a response
    pub max_page_size: usize,

    /// Longest accepted query, in characters
    pub max_query_length: usize,

    /// Scores closer than this are treated as a tie and ordered by recency
    pub tie_epsilon: f32,

    /// Maximum snippet length in characters
    pub snippet_max_chars: usize,

    /// Number of lock stripes serializing writes to the same record key
    pub write_lock_stripes: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: None,
            writer_heap_size: 20_000_000, // 20MB
            indexing_threads: 1,
            max_page_size: 100,
            max_query_length: 500,
            tie_epsilon: 0.1,
            snippet_max_chars: 150,
            write_lock_stripes: 64,
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = Some(path.into());
        self
    }

    pub fn in_memory(mut self) -> Self {
        self.config.index_path = None;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn max_page_size(mut self, max: usize) -> Self {
        self.config.max_page_size = max;
        self
    }

    pub fn tie_epsilon(mut self, epsilon: f32) -> Self {
        self.config.tie_epsilon = epsilon;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
