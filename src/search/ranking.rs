//! Cross-shard merge ordering, facets and pagination.
//!
//! Scores from different shards are not on a comparable scale, so hits whose
//! scores differ by no more than an epsilon are ordered by recency instead.
//! That rule is not transitive; `rank` uses a stable merge sort that accepts
//! an inconsistent comparator.

use crate::models::{AuthorFacet, SearchFacets, SearchResult};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of author facets reported
pub const TOP_AUTHORS: usize = 10;

/// Ordering of two hits under the score/recency tie rule
pub fn compare(a: &SearchResult, b: &SearchResult, epsilon: f32) -> Ordering {
    if (a.score - b.score).abs() > epsilon {
        return b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal);
    }
    // Newer first; rows without a timestamp sort last
    b.created_at.cmp(&a.created_at)
}

/// Sort merged hits in place, keeping input order among equal hits
pub fn rank(results: &mut Vec<SearchResult>, epsilon: f32) {
    if results.len() < 2 {
        return;
    }
    let items = std::mem::take(results);
    *results = merge_sort(items, &|a, b| compare(a, b, epsilon));
}

fn merge_sort<T, F>(mut items: Vec<T>, cmp: &F) -> Vec<T>
where
    F: Fn(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp);
    let right = merge_sort(right, cmp);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(l, r) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        merged.extend(next);
    }
    merged
}

/// Facet counts over the whole merged set
pub fn compute_facets(results: &[SearchResult]) -> SearchFacets {
    let mut facets = SearchFacets::default();

    // (author id, name) -> position in `authors`
    let mut author_slots: HashMap<(Option<&str>, &str), usize> = HashMap::new();
    let mut authors: Vec<AuthorFacet> = Vec::new();

    for result in results {
        *facets.types.entry(result.content_type).or_insert(0) += 1;

        if let Some(ref status) = result.status {
            *facets.statuses.entry(status.clone()).or_insert(0) += 1;
        }

        if let Some(ref name) = result.author_name {
            let key = (result.author_id.as_deref(), name.as_str());
            match author_slots.get(&key) {
                Some(&slot) => authors[slot].count += 1,
                None => {
                    author_slots.insert(key, authors.len());
                    authors.push(AuthorFacet {
                        id: result.author_id.clone(),
                        name: name.clone(),
                        count: 1,
                    });
                }
            }
        }
    }

    // Stable: equal counts keep first-seen order
    authors.sort_by(|a, b| b.count.cmp(&a.count));
    authors.truncate(TOP_AUTHORS);
    facets.authors = authors;

    facets
}

/// Slice one page out of the ranked set
pub fn paginate(results: Vec<SearchResult>, offset: usize, limit: usize) -> Vec<SearchResult> {
    results.into_iter().skip(offset).take(limit).collect()
}
