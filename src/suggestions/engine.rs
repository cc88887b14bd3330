//! Autocomplete over popular queries, recent searches, titles and authors

use crate::analytics::AnalyticsRecorder;
use crate::catalog::ContentSource;
use crate::metrics::SUGGESTIONS_SERVED_TOTAL;
use crate::suggestions::config::SuggestionsConfig;
use crate::suggestions::error::{SuggestionError, SuggestionResult};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;
use strum::{AsRefStr, Display as StrumDisplay};

/// Where a candidate came from, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, AsRefStr, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum SuggestionSource {
    Popular,
    Recent,
    Document,
    Author,
}

/// One autocomplete candidate before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub source: SuggestionSource,
    /// Popularity or usage count
    pub count: u64,
    pub last_used: Option<DateTime<Utc>>,
    /// Whether the candidate starts with the typed text
    pub prefix_match: bool,
}

/// Per-source caps for a requested limit: ⌈l/2⌉, ⌈l/3⌉, ⌈l/3⌉, ⌈l/4⌉
fn source_caps(limit: usize) -> (usize, usize, usize, usize) {
    (
        limit.div_ceil(2),
        limit.div_ceil(3),
        limit.div_ceil(3),
        limit.div_ceil(4),
    )
}

/// Builds suggestion lists from analytics and the catalog
pub struct SuggestionEngine {
    recorder: Arc<AnalyticsRecorder>,
    source: Arc<dyn ContentSource>,
    config: SuggestionsConfig,
}

impl SuggestionEngine {
    pub fn new(
        recorder: Arc<AnalyticsRecorder>,
        source: Arc<dyn ContentSource>,
        config: SuggestionsConfig,
    ) -> Self {
        Self {
            recorder,
            source,
            config,
        }
    }

    pub fn config(&self) -> &SuggestionsConfig {
        &self.config
    }

    /// Suggestions for a partially typed query.
    ///
    /// Input shorter than the minimum yields nothing; input longer than the
    /// maximum is rejected. A failing source contributes nothing.
    pub async fn get_suggestions(
        &self,
        partial: &str,
        user_id: Option<&str>,
        limit: usize,
    ) -> SuggestionResult<Vec<String>> {
        let partial = partial.trim();
        let length = partial.chars().count();
        if length > self.config.max_query_length {
            return Err(SuggestionError::InvalidInput(format!(
                "partial query is {} characters long, the maximum is {}",
                length, self.config.max_query_length
            )));
        }
        if length < self.config.min_query_length {
            return Ok(Vec::new());
        }

        let limit = limit.min(self.config.max_limit);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let (popular_cap, recent_cap, document_cap, author_cap) = source_caps(limit);
        let needle = partial.to_lowercase();

        let (popular, recent, documents, authors) = tokio::join!(
            self.popular_candidates(&needle, popular_cap),
            self.recent_candidates(&needle, user_id, recent_cap),
            self.document_candidates(partial, &needle, document_cap),
            self.author_candidates(partial, &needle, author_cap),
        );

        let candidates = dedupe(
            [popular, recent, documents, authors]
                .into_iter()
                .flatten()
                .collect(),
        );
        let ranked = rank_candidates(candidates, limit);

        for candidate in &ranked {
            SUGGESTIONS_SERVED_TOTAL
                .with_label_values(&[candidate.source.as_ref()])
                .inc();
        }

        Ok(ranked.into_iter().map(|c| c.text).collect())
    }

    async fn popular_candidates(&self, needle: &str, cap: usize) -> Vec<Candidate> {
        let popular = match self.recorder.get_popular_searches(usize::MAX).await {
            Ok(popular) => popular,
            Err(e) => return source_failed(SuggestionSource::Popular, e),
        };

        // Already ordered by search count, then recency
        popular
            .into_iter()
            .filter(|p| p.query.to_lowercase().starts_with(needle))
            .take(cap)
            .map(|p| Candidate {
                text: p.query,
                source: SuggestionSource::Popular,
                count: p.search_count,
                last_used: Some(p.last_searched_at),
                prefix_match: true,
            })
            .collect()
    }

    async fn recent_candidates(
        &self,
        needle: &str,
        user_id: Option<&str>,
        cap: usize,
    ) -> Vec<Candidate> {
        let Some(user_id) = user_id else {
            return Vec::new();
        };
        let history = match self
            .recorder
            .get_user_search_history(user_id, usize::MAX)
            .await
        {
            Ok(history) => history,
            Err(e) => return source_failed(SuggestionSource::Recent, e),
        };

        // History is newest first, so the first sighting carries the latest use
        let mut distinct: Vec<Candidate> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for entry in history {
            let key = entry.query.to_lowercase();
            if !key.starts_with(needle) {
                continue;
            }
            match slots.get(&key) {
                Some(&slot) => distinct[slot].count += 1,
                None => {
                    slots.insert(key, distinct.len());
                    distinct.push(Candidate {
                        text: entry.query,
                        source: SuggestionSource::Recent,
                        count: 1,
                        last_used: Some(entry.created_at),
                        prefix_match: true,
                    });
                }
            }
        }

        distinct.truncate(cap);
        distinct
    }

    async fn document_candidates(&self, partial: &str, needle: &str, cap: usize) -> Vec<Candidate> {
        let titles = match self.source.document_titles_matching(partial).await {
            Ok(titles) => titles,
            Err(e) => return source_failed(SuggestionSource::Document, e),
        };

        let mut candidates: Vec<Candidate> = titles
            .into_iter()
            .map(|title| Candidate {
                prefix_match: title.to_lowercase().starts_with(needle),
                text: title,
                source: SuggestionSource::Document,
                count: 0,
                last_used: None,
            })
            .collect();

        // Prefix matches first, then shorter titles
        candidates.sort_by(|a, b| {
            b.prefix_match
                .cmp(&a.prefix_match)
                .then_with(|| a.text.chars().count().cmp(&b.text.chars().count()))
                .then_with(|| a.text.cmp(&b.text))
        });
        candidates.truncate(cap);
        candidates
    }

    async fn author_candidates(&self, partial: &str, needle: &str, cap: usize) -> Vec<Candidate> {
        let mut authors = match self.source.authors_matching(partial).await {
            Ok(authors) => authors,
            Err(e) => return source_failed(SuggestionSource::Author, e),
        };

        authors.sort_by(|a, b| {
            b.comment_count
                .cmp(&a.comment_count)
                .then_with(|| a.name.cmp(&b.name))
        });

        authors
            .into_iter()
            .take(cap)
            .map(|author| Candidate {
                prefix_match: author.name.to_lowercase().starts_with(needle),
                text: format!("author:{}", author.name),
                source: SuggestionSource::Author,
                count: author.comment_count,
                last_used: None,
            })
            .collect()
    }
}

fn source_failed(source: SuggestionSource, error: impl Display) -> Vec<Candidate> {
    tracing::warn!(source = %source, error = %error, "Suggestion source failed");
    Vec::new()
}

/// Drop case-insensitive duplicates, keeping the first (highest-priority) one
pub fn dedupe(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.text.to_lowercase()))
        .collect()
}

/// Order candidates and keep the first `limit`.
///
/// Prefix matches first, then source priority, higher count, more recent
/// use (unknown last), shorter text.
pub fn rank_candidates(mut candidates: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.prefix_match
            .cmp(&a.prefix_match)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| match (a.last_used, b.last_used) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.text.chars().count().cmp(&b.text.chars().count()))
    });
    candidates.truncate(limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn candidate(text: &str, source: SuggestionSource, count: u64, prefix_match: bool) -> Candidate {
        Candidate {
            text: text.to_string(),
            source,
            count,
            last_used: None,
            prefix_match,
        }
    }

    #[test]
    fn test_source_caps_round_up() {
        assert_eq!(source_caps(10), (5, 4, 4, 3));
        assert_eq!(source_caps(1), (1, 1, 1, 1));
        assert_eq!(source_caps(0), (0, 0, 0, 0));
    }

    #[test]
    fn test_dedupe_keeps_first_case_insensitively() {
        let deduped = dedupe(vec![
            candidate("Deploy", SuggestionSource::Popular, 3, true),
            candidate("deploy", SuggestionSource::Recent, 1, true),
        ]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].source, SuggestionSource::Popular);
    }

    #[test]
    fn test_ranking_priority_chain() {
        let now = Utc::now();
        let mut older = candidate("deploy old", SuggestionSource::Recent, 1, true);
        older.last_used = Some(now - Duration::days(1));
        let mut newer = candidate("deploy new", SuggestionSource::Recent, 1, true);
        newer.last_used = Some(now);

        let ranked = rank_candidates(
            vec![
                candidate("author:Dee", SuggestionSource::Author, 50, false),
                candidate("Deployment guide", SuggestionSource::Document, 0, true),
                older,
                newer,
                candidate("deploy", SuggestionSource::Popular, 2, true),
                candidate("deploy now", SuggestionSource::Popular, 9, true),
            ],
            10,
        );
        let texts: Vec<&str> = ranked.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "deploy now",
                "deploy",
                "deploy new",
                "deploy old",
                "Deployment guide",
                "author:Dee",
            ]
        );
    }

    #[test]
    fn test_shorter_text_breaks_final_ties() {
        let ranked = rank_candidates(
            vec![
                candidate("Release checklist", SuggestionSource::Document, 0, true),
                candidate("Release", SuggestionSource::Document, 0, true),
            ],
            1,
        );
        assert_eq!(ranked[0].text, "Release");
    }
}
