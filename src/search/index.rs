//! Text-index collaborator: one tantivy index per content type

use crate::models::{ContentType, IndexedRecord};
use crate::search::config::SearchConfig;
use crate::search::document::{build_shard_schema, ShardSchema};
use crate::search::error::{Result, SearchError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{
    BooleanQuery, ConstScoreQuery, EmptyQuery, Occur, Query, QueryClone, QueryParser, RangeQuery,
    RegexQuery, TermQuery,
};
use tantivy::schema::IndexRecordOption;
use tantivy::snippet::SnippetGenerator;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::Mutex;

/// Equality or range predicate on a denormalized column
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    UserId(String),
    Status(String),
    Resolved(bool),
    DocPath(String),
    /// Inclusive bounds on `created_at`, in epoch milliseconds
    CreatedBetween {
        from_ms: Option<i64>,
        to_ms: Option<i64>,
    },
}

/// A query against one shard
#[derive(Debug, Clone, PartialEq)]
pub struct ShardQuery {
    /// Escaped match expression over the searchable text columns
    pub match_expr: String,
    pub predicates: Vec<Predicate>,
    /// Best-scoring rows to return; `None` returns every match
    pub limit: Option<usize>,
}

/// One row returned by a shard query
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub record: IndexedRecord,
    pub score: f32,
    /// Context around the match in `content`, matched terms in `<b>` tags
    pub snippet: Option<String>,
}

/// Index/query primitives the search engine depends on
#[async_trait]
pub trait TextIndex: Send + Sync {
    /// Replace the row for `(record.content_type, record.id)` in one commit
    async fn upsert(&self, record: &IndexedRecord) -> Result<()>;

    /// Remove the row for `(content_type, id)` if present
    async fn delete(&self, content_type: ContentType, id: &str) -> Result<()>;

    /// Remove every row of a shard
    async fn clear(&self, content_type: ContentType) -> Result<()>;

    /// Insert many rows into a shard with a single commit
    async fn insert_batch(&self, content_type: ContentType, records: &[IndexedRecord])
        -> Result<usize>;

    /// Run a match query with predicates against a shard
    async fn search(&self, content_type: ContentType, query: &ShardQuery)
        -> Result<Vec<IndexHit>>;

    /// Number of live rows in a shard
    async fn count(&self, content_type: ContentType) -> Result<u64>;
}

struct Shard {
    content_type: ContentType,
    index: Index,
    fields: ShardSchema,
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    snippet_max_chars: usize,
}

impl Shard {
    fn open(content_type: ContentType, config: &SearchConfig) -> Result<Self> {
        let fields = build_shard_schema();

        let index = match config.index_path {
            Some(ref root) => {
                let dir = root.join(content_type.shard_name());
                std::fs::create_dir_all(&dir).map_err(|e| {
                    SearchError::IndexInitFailed(format!(
                        "Failed to create index directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
                if Self::index_exists(&dir) {
                    Index::open_in_dir(&dir).map_err(|e| {
                        SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
                    })?
                } else {
                    Index::create_in_dir(&dir, fields.schema.clone()).map_err(|e| {
                        SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
                    })?
                }
            }
            None => Index::create_in_ram(fields.schema.clone()),
        };

        let writer = index
            .writer_with_num_threads(config.indexing_threads.max(1), config.writer_heap_size)
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create writer: {}", e)))?;

        // Reloaded explicitly after every commit so writes are visible immediately
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| SearchError::IndexInitFailed(format!("Failed to create reader: {}", e)))?;

        Ok(Self {
            content_type,
            index,
            fields,
            writer: Mutex::new(writer),
            reader,
            snippet_max_chars: config.snippet_max_chars,
        })
    }

    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    fn id_term(&self, id: &str) -> Term {
        Term::from_field_text(self.fields.id, id)
    }

    /// Commit pending operations, discarding them if the commit fails
    fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
        if let Err(e) = writer.commit() {
            if let Err(rollback) = writer.rollback() {
                tracing::error!(
                    shard = self.content_type.shard_name(),
                    error = %rollback,
                    "Rollback after failed commit also failed"
                );
            }
            return Err(e.into());
        }
        self.reader.reload()?;
        Ok(())
    }

    fn predicate_query(&self, predicate: &Predicate) -> Box<dyn Query> {
        let query: Box<dyn Query> = match predicate {
            Predicate::UserId(user_id) => Box::new(TermQuery::new(
                Term::from_field_text(self.fields.user_id, user_id),
                IndexRecordOption::Basic,
            )),
            Predicate::Status(status) => Box::new(TermQuery::new(
                Term::from_field_text(self.fields.status, status),
                IndexRecordOption::Basic,
            )),
            Predicate::Resolved(resolved) => Box::new(TermQuery::new(
                Term::from_field_bool(self.fields.resolved, *resolved),
                IndexRecordOption::Basic,
            )),
            Predicate::DocPath(doc_path) => Box::new(TermQuery::new(
                Term::from_field_text(self.fields.doc_path, doc_path),
                IndexRecordOption::Basic,
            )),
            Predicate::CreatedBetween { from_ms, to_ms } => Box::new(RangeQuery::new_i64_bounds(
                "created_at".to_string(),
                from_ms.map_or(Bound::Unbounded, Bound::Included),
                to_ms.map_or(Bound::Unbounded, Bound::Included),
            )),
        };
        // Predicates filter; they must not shift relevance
        Box::new(ConstScoreQuery::new(query, 0.0))
    }

    /// Match query over title and content.
    ///
    /// The parser only builds phrase-prefix queries of two or more terms, so a
    /// single-word prefix becomes a regex over the term dictionary and a prefix
    /// without any word matches nothing.
    fn text_query(&self, parser: &QueryParser, expr: &str) -> Result<Box<dyn Query>> {
        let word = match prefix_words(expr) {
            Some(words) if words.is_empty() => return Ok(Box::new(EmptyQuery)),
            Some(mut words) if words.len() == 1 => words.remove(0),
            _ => return Ok(parser.parse_query(expr)?),
        };

        let pattern = format!("{}.*", word);
        let clauses = [self.fields.title, self.fields.content]
            .into_iter()
            .map(|field| {
                RegexQuery::from_pattern(&pattern, field)
                    .map(|query| (Occur::Should, Box::new(query) as Box<dyn Query>))
            })
            .collect::<tantivy::Result<Vec<_>>>()?;
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    fn search_blocking(&self, query: &ShardQuery) -> Result<Vec<IndexHit>> {
        let searcher = self.reader.searcher();

        let parser = QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.content]);
        let text_query = self.text_query(&parser, &query.match_expr)?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(Occur::Must, text_query.box_clone())];
        for predicate in &query.predicates {
            clauses.push((Occur::Must, self.predicate_query(predicate)));
        }
        let combined = BooleanQuery::new(clauses);

        let matches = searcher.search(&combined, &Count)?;
        let wanted = query.limit.map_or(matches, |limit| limit.min(matches));
        if wanted == 0 {
            return Ok(Vec::new());
        }
        let top_docs = searcher.search(&combined, &TopDocs::with_limit(wanted))?;

        let mut snippets = SnippetGenerator::create(&searcher, &*text_query, self.fields.content)?;
        snippets.set_max_num_chars(self.snippet_max_chars);

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            let snippet = snippets.snippet_from_doc(&doc);
            let snippet = if snippet.fragment().is_empty() {
                None
            } else {
                Some(snippet.to_html())
            };
            hits.push(IndexHit {
                record: self.fields.from_tantivy_doc(self.content_type, &doc)?,
                score,
                snippet,
            });
        }

        Ok(hits)
    }
}

/// Tokens longer than this are dropped by the default tokenizer
const MAX_TOKEN_BYTES: usize = 40;

/// Lowercased terms of a `"..."*` expression, as the default tokenizer would
/// produce them; `None` when the expression is not a phrase prefix
fn prefix_words(expr: &str) -> Option<Vec<String>> {
    let body = expr.strip_prefix('"')?.strip_suffix("\"*")?;
    Some(
        body.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty() && word.len() < MAX_TOKEN_BYTES)
            .map(str::to_lowercase)
            .collect(),
    )
}

/// `TextIndex` backed by tantivy, on disk or in RAM
pub struct TantivyTextIndex {
    shards: HashMap<ContentType, Arc<Shard>>,
}

impl TantivyTextIndex {
    /// Open (or create) one index per content type
    pub fn open(config: &SearchConfig) -> Result<Self> {
        let mut shards = HashMap::with_capacity(ContentType::ALL.len());
        for content_type in ContentType::ALL {
            shards.insert(content_type, Arc::new(Shard::open(content_type, config)?));
        }

        match config.index_path {
            Some(ref path) => tracing::info!(path = %path.display(), "Opened on-disk search shards"),
            None => tracing::info!("Opened in-memory search shards"),
        }

        Ok(Self { shards })
    }

    fn shard(&self, content_type: ContentType) -> Result<&Arc<Shard>> {
        self.shards
            .get(&content_type)
            .ok_or_else(|| SearchError::Index(format!("no shard for {}", content_type)))
    }
}

#[async_trait]
impl TextIndex for TantivyTextIndex {
    async fn upsert(&self, record: &IndexedRecord) -> Result<()> {
        let shard = self.shard(record.content_type)?;
        let doc = shard.fields.to_tantivy_doc(record);

        let mut writer = shard.writer.lock().await;
        writer.delete_term(shard.id_term(&record.id));
        writer
            .add_document(doc)
            .map_err(|e| SearchError::write(record.content_type, &record.id, e))?;
        shard
            .commit(&mut writer)
            .map_err(|e| SearchError::write(record.content_type, &record.id, e))
    }

    async fn delete(&self, content_type: ContentType, id: &str) -> Result<()> {
        let shard = self.shard(content_type)?;
        let mut writer = shard.writer.lock().await;
        writer.delete_term(shard.id_term(id));
        shard
            .commit(&mut writer)
            .map_err(|e| SearchError::write(content_type, id, e))
    }

    async fn clear(&self, content_type: ContentType) -> Result<()> {
        let shard = self.shard(content_type)?;
        let mut writer = shard.writer.lock().await;
        writer.delete_all_documents()?;
        shard.commit(&mut writer)
    }

    async fn insert_batch(
        &self,
        content_type: ContentType,
        records: &[IndexedRecord],
    ) -> Result<usize> {
        let shard = self.shard(content_type)?;
        let mut writer = shard.writer.lock().await;

        for record in records {
            writer.delete_term(shard.id_term(&record.id));
            writer
                .add_document(shard.fields.to_tantivy_doc(record))
                .map_err(|e| SearchError::write(content_type, &record.id, e))?;
        }
        shard.commit(&mut writer)?;

        Ok(records.len())
    }

    async fn search(&self, content_type: ContentType, query: &ShardQuery) -> Result<Vec<IndexHit>> {
        let shard = Arc::clone(self.shard(content_type)?);
        let query = query.clone();

        tokio::task::spawn_blocking(move || shard.search_blocking(&query))
            .await
            .map_err(|e| SearchError::Index(format!("search task failed: {}", e)))?
    }

    async fn count(&self, content_type: ContentType) -> Result<u64> {
        let shard = self.shard(content_type)?;
        Ok(shard.reader.searcher().num_docs())
    }
}
