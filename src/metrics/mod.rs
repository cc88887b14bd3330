//! Prometheus metrics for the search service.
//!
//! All collectors live in one global registry, exported in the text format
//! by the `/metrics` endpoint.
//!
//! # Example
//! ```no_run
//! use review_search::metrics::SEARCHES_TOTAL;
//!
//! SEARCHES_TOTAL.with_label_values(&["ok"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};

const NAMESPACE: &str = "review_search";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Searches executed
    ///
    /// Labels: outcome (ok, empty, invalid, error)
    pub static ref SEARCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("searches_total", "Total number of search requests")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create SEARCHES_TOTAL metric");

    /// Search latency in seconds, including merge and facets
    ///
    /// Labels: type
    pub static ref SEARCH_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "search_duration_seconds",
            "Search execution time in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
        &["type"]
    ).expect("Failed to create SEARCH_DURATION_SECONDS metric");

    /// Single-row index writes
    ///
    /// Labels: content_type, op (upsert, remove), outcome
    pub static ref INDEX_WRITES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("index_writes_total", "Total number of index row writes")
            .namespace(NAMESPACE),
        &["content_type", "op", "outcome"]
    ).expect("Failed to create INDEX_WRITES_TOTAL metric");

    /// Autocomplete suggestions returned
    ///
    /// Labels: source (popular, recent, document, author)
    pub static ref SUGGESTIONS_SERVED_TOTAL: CounterVec = CounterVec::new(
        Opts::new("suggestions_served_total", "Total number of suggestions returned")
            .namespace(NAMESPACE),
        &["source"]
    ).expect("Failed to create SUGGESTIONS_SERVED_TOTAL metric");

    /// Analytics writes that failed in the background
    ///
    /// Labels: op
    pub static ref ANALYTICS_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("analytics_failures_total", "Background analytics writes that failed")
            .namespace(NAMESPACE),
        &["op"]
    ).expect("Failed to create ANALYTICS_FAILURES_TOTAL metric");
}

/// Register all collectors with the global registry.
///
/// Safe to call more than once.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_DURATION_SECONDS.clone()),
        Box::new(INDEX_WRITES_TOTAL.clone()),
        Box::new(SUGGESTIONS_SERVED_TOTAL.clone()),
        Box::new(ANALYTICS_FAILURES_TOTAL.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::debug!("Prometheus metrics registered");
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics().unwrap();
        SEARCHES_TOTAL.with_label_values(&["ok"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("review_search_searches_total"));
    }
}
