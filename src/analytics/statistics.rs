//! Pure reductions over query logs

use crate::models::{PerformanceStats, QueryCount, SearchMetrics, SearchQueryLog, SlowQuery};
use chrono::Timelike;
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Nearest-rank percentile: `sorted[floor(count * p)]`, no interpolation.
///
/// `sorted` must be ascending; an empty sample yields 0.
pub fn nearest_rank(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (sorted.len() as f64 * p).floor() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

/// Percentage of `part` in `total`, 0 when there is nothing to divide
fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn mean(sum: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Most frequent query strings, count descending then alphabetical
fn top_queries<'a>(queries: impl Iterator<Item = &'a str>, limit: usize) -> Vec<QueryCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for query in queries {
        *counts.entry(query).or_insert(0) += 1;
    }

    let mut ranked: Vec<QueryCount> = counts
        .into_iter()
        .map(|(query, count)| QueryCount {
            query: query.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
    ranked.truncate(limit);
    ranked
}

/// Dashboard metrics over a set of logs
pub fn compute_metrics(logs: &[SearchQueryLog], timezone: Tz, top_n: usize) -> SearchMetrics {
    let total = logs.len() as u64;

    let unique_users: HashSet<&str> = logs.iter().filter_map(|l| l.user_id.as_deref()).collect();
    let clicked = logs.iter().filter(|l| l.was_clicked()).count() as u64;
    let no_results = logs.iter().filter(|l| l.result_count == 0).count() as u64;

    let mut searches_by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut searches_by_hour = [0u64; 24];
    for log in logs {
        *searches_by_type.entry(log.query_type.clone()).or_insert(0) += 1;
        let hour = log.created_at.with_timezone(&timezone).hour() as usize;
        searches_by_hour[hour] += 1;
    }

    SearchMetrics {
        total_searches: total,
        unique_users: unique_users.len() as u64,
        avg_result_count: mean(logs.iter().map(|l| l.result_count).sum(), total),
        avg_response_time: mean(logs.iter().map(|l| l.response_time_ms).sum(), total),
        click_through_rate: rate(clicked, total),
        no_results_rate: rate(no_results, total),
        top_queries: top_queries(logs.iter().map(|l| l.query.as_str()), top_n),
        top_no_results_queries: top_queries(
            logs.iter()
                .filter(|l| l.result_count == 0)
                .map(|l| l.query.as_str()),
            top_n,
        ),
        searches_by_type,
        searches_by_hour,
    }
}

/// Response-time distribution and the slowest individual queries
pub fn performance_stats(logs: &[SearchQueryLog], slowest: usize) -> PerformanceStats {
    let mut times: Vec<u64> = logs.iter().map(|l| l.response_time_ms).collect();
    times.sort_unstable();

    let mut slow: Vec<&SearchQueryLog> = logs.iter().collect();
    slow.sort_by(|a, b| {
        b.response_time_ms
            .cmp(&a.response_time_ms)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    PerformanceStats {
        count: times.len() as u64,
        avg_ms: mean(times.iter().sum(), times.len() as u64),
        min_ms: times.first().copied().unwrap_or(0),
        max_ms: times.last().copied().unwrap_or(0),
        p50_ms: nearest_rank(&times, 0.50),
        p95_ms: nearest_rank(&times, 0.95),
        p99_ms: nearest_rank(&times, 0.99),
        slowest_queries: slow
            .into_iter()
            .take(slowest)
            .map(|log| SlowQuery {
                query: log.query.clone(),
                response_time_ms: log.response_time_ms,
                result_count: log.result_count,
                created_at: log.created_at,
            })
            .collect(),
    }
}
