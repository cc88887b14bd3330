//! Query escaping and per-shard query planning

use crate::models::{ContentType, SearchFilters, StatusColumn};
use crate::search::index::{Predicate, ShardQuery};

/// Escaped form of an empty or whitespace-only query
pub const EMPTY_PHRASE: &str = "\"\"";

/// Status vocabulary of shards that store a resolution flag
const RESOLVED_FLAG_STATUSES: &[(&str, bool)] = &[("open", false), ("resolved", true)];

/// Normalize raw user input into a match expression.
///
/// - a quoted phrase passes through
/// - a trailing `*` makes a phrase-prefix query over the quoted remainder
/// - anything else is quoted whole, so multi-word input matches as an exact
///   phrase rather than as independent terms
///
/// Parentheses are dropped from unquoted input, prefix remainders included.
/// Double quotes and backslashes inside the phrase body are dropped so the
/// result always parses. A prefix remainder made only of punctuation stays a
/// prefix expression; the index treats it as matching nothing.
pub fn escape_query(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return EMPTY_PHRASE.to_string();
    }

    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        return quote(&trimmed[1..trimmed.len() - 1], false);
    }

    if let Some(remainder) = trimmed.strip_suffix('*') {
        return quote(&strip_parens(remainder), true);
    }

    quote(&strip_parens(trimmed), false)
}

/// Whether an escaped expression is the empty-phrase sentinel
pub fn is_empty_phrase(expr: &str) -> bool {
    expr == EMPTY_PHRASE
}

fn strip_parens(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '(' | ')')).collect()
}

fn quote(body: &str, prefix: bool) -> String {
    let body: String = body.chars().filter(|c| !matches!(c, '"' | '\\')).collect();
    let body = body.trim();
    if body.is_empty() {
        return EMPTY_PHRASE.to_string();
    }
    if prefix {
        format!("\"{}\"*", body)
    } else {
        format!("\"{}\"", body)
    }
}

/// Translate request filters into predicates for one shard.
///
/// Returns `None` when the filters can never match a row of that shard,
/// so the shard contributes nothing and is not queried.
pub fn shard_predicates(content_type: ContentType, filters: &SearchFilters) -> Option<Vec<Predicate>> {
    let columns = content_type.columns();
    let mut predicates = Vec::new();

    if let Some(ref user_id) = filters.user_id {
        if !columns.user_id {
            return None;
        }
        predicates.push(Predicate::UserId(user_id.clone()));
    }

    match columns.status {
        StatusColumn::Absent => {
            if filters.status.is_some() {
                return None;
            }
        }
        StatusColumn::ResolvedFlag => {
            // `status` wins over an explicit `resolved` flag
            let resolved = match filters.status {
                Some(ref status) => Some(
                    RESOLVED_FLAG_STATUSES
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case(status))
                        .map(|&(_, flag)| flag)?,
                ),
                None => filters.resolved,
            };
            if let Some(resolved) = resolved {
                predicates.push(Predicate::Resolved(resolved));
            }
        }
        StatusColumn::Text => {
            if let Some(ref status) = filters.status {
                predicates.push(Predicate::Status(status.clone()));
            }
        }
    }

    if let Some(ref doc_path) = filters.doc_path {
        predicates.push(Predicate::DocPath(doc_path.clone()));
    }

    if filters.after.is_some() || filters.before.is_some() {
        predicates.push(Predicate::CreatedBetween {
            from_ms: filters.after.map(|at| at.timestamp_millis()),
            to_ms: filters.before.map(|at| at.timestamp_millis()),
        });
    }

    Some(predicates)
}

/// Plan the shard queries for a request, skipping shards that cannot match.
///
/// Every shard returns all of its matches: ranking, facets and `total` are
/// defined over the whole merged set.
pub fn plan_shard_queries(match_expr: &str, filters: &SearchFilters) -> Vec<(ContentType, ShardQuery)> {
    filters
        .content_type
        .shards()
        .into_iter()
        .filter_map(|content_type| {
            let predicates = shard_predicates(content_type, filters)?;
            Some((
                content_type,
                ShardQuery {
                    match_expr: match_expr.to_string(),
                    predicates,
                    limit: None,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypeFilter;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_escape_query() {
        assert_eq!(escape_query("database error"), "\"database error\"");
        assert_eq!(escape_query("\"exact words\""), "\"exact words\"");
        assert_eq!(escape_query("deploy*"), "\"deploy\"*");
        assert_eq!(escape_query("(draft) notes"), "\"draft notes\"");
        assert_eq!(escape_query("say \"hi\" there"), "\"say hi there\"");
        assert_eq!(escape_query("(deploy)*"), "\"deploy\"*");
    }

    #[test]
    fn test_punctuation_prefix_is_not_the_empty_sentinel() {
        assert_eq!(escape_query("!!*"), "\"!!\"*");
        assert_eq!(escape_query("-*"), "\"-\"*");
        assert!(!is_empty_phrase(&escape_query("^*")));
    }

    #[test]
    fn test_escape_empty_input_yields_sentinel() {
        assert!(is_empty_phrase(&escape_query("")));
        assert!(is_empty_phrase(&escape_query("   \t")));
        assert!(is_empty_phrase(&escape_query("*")));
        assert!(is_empty_phrase(&escape_query("\"\"")));
        assert!(is_empty_phrase(&escape_query("()")));
    }

    #[test]
    fn test_documents_reject_user_and_status_filters() {
        let filters = SearchFilters {
            user_id: Some("u1".into()),
            ..Default::default()
        };
        assert!(shard_predicates(ContentType::Document, &filters).is_none());
        assert!(shard_predicates(ContentType::Comment, &filters).is_some());

        let filters = SearchFilters {
            status: Some("pending".into()),
            ..Default::default()
        };
        assert!(shard_predicates(ContentType::Document, &filters).is_none());
        assert!(shard_predicates(ContentType::Message, &filters).is_none());
        assert_eq!(
            shard_predicates(ContentType::Suggestion, &filters),
            Some(vec![Predicate::Status("pending".into())])
        );
    }

    #[test]
    fn test_comment_status_vocabulary() {
        let filters = SearchFilters {
            status: Some("resolved".into()),
            resolved: Some(false),
            ..Default::default()
        };
        assert_eq!(
            shard_predicates(ContentType::Comment, &filters),
            Some(vec![Predicate::Resolved(true)])
        );

        let filters = SearchFilters {
            status: Some("pending".into()),
            ..Default::default()
        };
        assert!(shard_predicates(ContentType::Comment, &filters).is_none());

        let filters = SearchFilters {
            resolved: Some(false),
            ..Default::default()
        };
        assert_eq!(
            shard_predicates(ContentType::Comment, &filters),
            Some(vec![Predicate::Resolved(false)])
        );
        // Only comments know the flag
        assert_eq!(shard_predicates(ContentType::Discussion, &filters), Some(vec![]));
    }

    #[test]
    fn test_doc_path_and_dates_apply_to_every_shard() {
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filters = SearchFilters {
            content_type: TypeFilter::Discussions,
            doc_path: Some("/guide.md".into()),
            after: Some(after),
            ..Default::default()
        };

        let plan = plan_shard_queries("\"x\"", &filters);
        assert_eq!(plan.len(), 2);
        for (_, query) in plan {
            assert_eq!(query.limit, None);
            assert_eq!(
                query.predicates,
                vec![
                    Predicate::DocPath("/guide.md".into()),
                    Predicate::CreatedBetween {
                        from_ms: Some(after.timestamp_millis()),
                        to_ms: None,
                    },
                ]
            );
        }
    }
}
