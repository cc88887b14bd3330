//! Analytics configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where query logs, popular queries and history live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sled,
}

/// Configuration for the analytics recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub backend: StoreBackend,

    /// Database directory for the sled backend
    pub path: Option<PathBuf>,

    /// Rows kept per user in search history
    pub history_cap: usize,

    /// Length of the top-queries lists in dashboard metrics
    pub top_queries: usize,

    /// Number of slowest queries in performance stats
    pub slow_queries: usize,

    /// IANA timezone used to bucket searches by hour of day
    pub timezone: String,

    /// Query logs older than this are swept by the retention job
    pub retention_days: u32,

    /// Cron expression (with seconds) for the retention job
    pub retention_schedule: String,

    pub retention_enabled: bool,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            history_cap: 100,
            top_queries: 10,
            slow_queries: 10,
            timezone: "UTC".to_string(),
            retention_days: 90,
            retention_schedule: "0 0 3 * * *".to_string(), // 03:00 daily
            retention_enabled: true,
        }
    }
}
