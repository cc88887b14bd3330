pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::analytics::{create_analytics_store, AnalyticsRecorder};
use crate::catalog::ContentSource;
use crate::config::Config;
use crate::error::Result;
use crate::search::{IndexMaintainer, SearchService, TantivyTextIndex, TextIndex};
use crate::suggestions::SuggestionEngine;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub maintainer: Arc<IndexMaintainer>,
    pub analytics: Arc<AnalyticsRecorder>,
    pub suggestions: Arc<SuggestionEngine>,
    pub started_at: Instant,
}

impl AppState {
    /// Wire every service from configuration over one content source
    pub fn from_config(config: &Config, source: Arc<dyn ContentSource>) -> Result<Self> {
        let index: Arc<dyn TextIndex> = Arc::new(TantivyTextIndex::open(&config.search)?);
        let store = create_analytics_store(&config.analytics)?;
        let analytics = Arc::new(AnalyticsRecorder::new(store, config.analytics.clone())?);

        let search = Arc::new(SearchService::new(
            Arc::clone(&index),
            Arc::clone(&analytics),
            config.search.clone(),
        ));
        let maintainer = Arc::new(IndexMaintainer::new(
            index,
            Arc::clone(&source),
            config.search.write_lock_stripes,
        ));
        let suggestions = Arc::new(SuggestionEngine::new(
            Arc::clone(&analytics),
            source,
            config.suggestions.clone(),
        ));

        Ok(Self {
            search,
            maintainer,
            analytics,
            suggestions,
            started_at: Instant::now(),
        })
    }
}
