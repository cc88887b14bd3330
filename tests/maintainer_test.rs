//! Integration tests for shard maintenance

mod common;

use chrono::{Duration, Utc};
use review_search::catalog::{CanonicalRecord, InMemoryContentSource, UserRecord};
use review_search::models::{ContentType, IndexedRecord};
use review_search::search::*;
use std::sync::Arc;
use common::{Faults, FaultyIndex};
use tempfile::TempDir;

fn canonical(content_type: ContentType, id: &str, content: &str) -> CanonicalRecord {
    CanonicalRecord {
        id: id.to_string(),
        content_type,
        doc_path: Some("/handbook.md".to_string()),
        discussion_id: None,
        title: None,
        content: content.to_string(),
        user_id: Some("u1".to_string()),
        status: None,
        resolved: None,
        created_at: Utc::now() - Duration::minutes(5),
        deleted_at: None,
    }
}

fn seeded_catalog() -> InMemoryContentSource {
    let source = InMemoryContentSource::new();
    source.put_user(UserRecord {
        id: "u1".to_string(),
        name: "Ada Lovelace".to_string(),
    });

    let mut document = canonical(ContentType::Document, "d1", "onboarding handbook");
    document.title = Some("Handbook".to_string());
    source.put(document);

    for id in ["c1", "c2", "c3"] {
        let mut comment = canonical(ContentType::Comment, id, "typo in onboarding section");
        comment.resolved = Some(false);
        source.put(comment);
    }

    let mut suggestion = canonical(ContentType::Suggestion, "s1", "reword the onboarding intro");
    suggestion.status = Some("pending".to_string());
    source.put(suggestion);

    let mut discussion = canonical(ContentType::Discussion, "t1", "who owns onboarding?");
    discussion.title = Some("Ownership".to_string());
    discussion.status = Some("open".to_string());
    source.put(discussion);

    let mut message = canonical(ContentType::Message, "m1", "platform team owns onboarding");
    message.doc_path = None;
    message.discussion_id = Some("t1".to_string());
    source.put(message);

    let mut orphan = canonical(ContentType::Message, "m2", "reply to a deleted thread");
    orphan.doc_path = None;
    orphan.discussion_id = Some("gone".to_string());
    source.put(orphan);

    source
}

struct Harness {
    maintainer: IndexMaintainer,
    index: Arc<dyn TextIndex>,
    source: InMemoryContentSource,
    _temp_dir: TempDir,
}

fn create_harness(source: InMemoryContentSource) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfigBuilder::new()
        .index_path(temp_dir.path())
        .build();
    let index: Arc<dyn TextIndex> = Arc::new(TantivyTextIndex::open(&config).unwrap());

    Harness {
        maintainer: IndexMaintainer::new(Arc::clone(&index), Arc::new(source.clone()), 8),
        index,
        source,
        _temp_dir: temp_dir,
    }
}

fn comment_query(text: &str) -> ShardQuery {
    ShardQuery {
        match_expr: escape_query(text),
        predicates: Vec::new(),
        limit: Some(100),
    }
}

#[tokio::test]
async fn test_rebuild_indexes_every_live_record() {
    let harness = create_harness(seeded_catalog());

    let counts = harness.maintainer.rebuild_all().await.unwrap();
    assert_eq!(
        counts,
        RebuildCounts {
            documents: 1,
            comments: 3,
            suggestions: 1,
            discussions: 1,
            messages: 1,
        }
    );

    let stats = harness.maintainer.stats().await.unwrap();
    assert_eq!(stats.rows.get(&ContentType::Message), Some(&1));
}

#[tokio::test]
async fn test_rebuild_denormalizes_author_and_message_path() {
    let harness = create_harness(seeded_catalog());
    harness.maintainer.rebuild_all().await.unwrap();

    let hits = harness
        .index
        .search(ContentType::Message, &comment_query("platform team"))
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.doc_path, "/handbook.md");
    assert_eq!(hits[0].record.parent_id.as_deref(), Some("t1"));
    assert_eq!(hits[0].record.author_name.as_deref(), Some("Ada Lovelace"));
}

#[tokio::test]
async fn test_rebuild_after_soft_delete_drops_one_comment() {
    let harness = create_harness(seeded_catalog());

    let before = harness.maintainer.rebuild_all().await.unwrap();
    assert!(harness.source.soft_delete(ContentType::Comment, "c2"));
    let after = harness.maintainer.rebuild_all().await.unwrap();

    assert_eq!(after.comments, before.comments - 1);
    assert_eq!(harness.index.count(ContentType::Comment).await.unwrap(), 2);
}

#[tokio::test]
async fn test_double_upsert_leaves_one_row() {
    let harness = create_harness(InMemoryContentSource::new());
    let now = Utc::now();

    let first = IndexedRecord::comment("c1", "/a.md", "first draft", false, now);
    let second = IndexedRecord::comment("c1", "/a.md", "second draft", true, now);
    harness.maintainer.upsert(ContentType::Comment, first).await.unwrap();
    harness.maintainer.upsert(ContentType::Comment, second).await.unwrap();

    assert_eq!(harness.index.count(ContentType::Comment).await.unwrap(), 1);
    let hits = harness
        .index
        .search(ContentType::Comment, &comment_query("draft"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].record.content, "second draft");
    assert_eq!(hits[0].record.resolved, Some(true));
}

#[tokio::test]
async fn test_concurrent_upserts_of_one_key_leave_one_row() {
    let harness = Arc::new(create_harness(InMemoryContentSource::new()));
    let now = Utc::now();

    let writers: Vec<_> = (0..16)
        .map(|i| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move {
                let record =
                    IndexedRecord::comment("hot", "/a.md", format!("revision {}", i), false, now);
                harness
                    .maintainer
                    .upsert(ContentType::Comment, record)
                    .await
                    .unwrap();
            })
        })
        .collect();
    futures::future::join_all(writers).await;

    assert_eq!(harness.index.count(ContentType::Comment).await.unwrap(), 1);
}

#[tokio::test]
async fn test_upsert_rejects_mismatched_type_and_empty_id() {
    let harness = create_harness(InMemoryContentSource::new());
    let now = Utc::now();

    let comment = IndexedRecord::comment("c1", "/a.md", "body", false, now);
    assert!(matches!(
        harness.maintainer.upsert(ContentType::Document, comment).await,
        Err(SearchError::InvalidInput(_))
    ));

    let blank = IndexedRecord::comment("  ", "/a.md", "body", false, now);
    assert!(matches!(
        harness.maintainer.upsert(ContentType::Comment, blank).await,
        Err(SearchError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_reindex_record_follows_canonical_state() {
    let harness = create_harness(seeded_catalog());

    harness
        .maintainer
        .reindex_record(ContentType::Comment, "c1")
        .await
        .unwrap();
    assert_eq!(harness.index.count(ContentType::Comment).await.unwrap(), 1);

    harness.source.soft_delete(ContentType::Comment, "c1");
    harness
        .maintainer
        .reindex_record(ContentType::Comment, "c1")
        .await
        .unwrap();
    assert_eq!(harness.index.count(ContentType::Comment).await.unwrap(), 0);

    // Unknown ids are simply absent from the shard
    harness
        .maintainer
        .reindex_record(ContentType::Comment, "nope")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_missing_row_is_a_no_op() {
    let harness = create_harness(InMemoryContentSource::new());
    harness
        .maintainer
        .remove(ContentType::Suggestion, "never-indexed")
        .await
        .unwrap();
    assert_eq!(harness.index.count(ContentType::Suggestion).await.unwrap(), 0);
}

fn create_faulty_harness(source: InMemoryContentSource, faults: Faults) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let config = SearchConfigBuilder::new()
        .index_path(temp_dir.path())
        .build();
    let real: Arc<dyn TextIndex> = Arc::new(TantivyTextIndex::open(&config).unwrap());
    let index: Arc<dyn TextIndex> = Arc::new(FaultyIndex::new(real, faults));

    Harness {
        maintainer: IndexMaintainer::new(Arc::clone(&index), Arc::new(source.clone()), 8),
        index,
        source,
        _temp_dir: temp_dir,
    }
}

#[tokio::test]
async fn test_failed_upsert_reports_type_and_id() {
    let harness = create_faulty_harness(
        InMemoryContentSource::new(),
        Faults {
            writes: true,
            ..Default::default()
        },
    );

    let record = IndexedRecord::comment("c7", "/a.md", "text", false, Utc::now());
    match harness.maintainer.upsert(ContentType::Comment, record).await {
        Err(SearchError::IndexWrite { content_type, id, .. }) => {
            assert_eq!(content_type, ContentType::Comment);
            assert_eq!(id, "c7");
        }
        other => panic!("expected an index write error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_remove_reports_type_and_id() {
    let harness = create_faulty_harness(
        InMemoryContentSource::new(),
        Faults {
            writes: true,
            ..Default::default()
        },
    );

    match harness.maintainer.remove(ContentType::Suggestion, "s3").await {
        Err(SearchError::IndexWrite { content_type, id, .. }) => {
            assert_eq!(content_type, ContentType::Suggestion);
            assert_eq!(id, "s3");
        }
        other => panic!("expected an index write error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_batch_aborts_rebuild() {
    let harness = create_faulty_harness(
        seeded_catalog(),
        Faults {
            batches: true,
            ..Default::default()
        },
    );

    assert!(matches!(
        harness.maintainer.rebuild_all().await,
        Err(SearchError::Reindex(_))
    ));
    // Cleared shards are not restored
    assert_eq!(harness.index.count(ContentType::Comment).await.unwrap(), 0);
}
