//! Search analytics
//!
//! Every executed search is logged with its filters, result count and
//! response time. Logs feed three things:
//!
//! - **Popular queries**: a running-mean aggregate per distinct query string,
//!   updated incrementally and never recomputed from the logs
//! - **Dashboards**: click-through and no-result rates, top queries, hourly
//!   distribution, and nearest-rank response-time percentiles
//! - **History**: the most recent searches of each user, capped per user
//!
//! Storage sits behind [`AnalyticsStore`], with an in-memory backend and a
//! persistent sled backend.

mod config;
mod error;
mod memory_store;
mod recorder;
mod sled_store;
mod statistics;
mod store;

pub use config::{AnalyticsConfig, StoreBackend};
pub use error::{AnalyticsError, AnalyticsResult};
pub use memory_store::InMemoryAnalyticsStore;
pub use recorder::AnalyticsRecorder;
pub use sled_store::SledAnalyticsStore;
pub use statistics::{compute_metrics, nearest_rank, performance_stats};
pub use store::{create_analytics_store, AnalyticsStore};
