//! Shard schema and row mapping

use crate::models::{ContentType, IndexedRecord};
use crate::search::error::{Result, SearchError};
use chrono::{DateTime, Utc};
use tantivy::schema::{Field, Schema, Value, FAST, INDEXED, STORED, STRING, TEXT};
use tantivy::TantivyDocument;

/// Field handles of the schema shared by every shard
#[derive(Debug, Clone)]
pub struct ShardSchema {
    pub schema: Schema,
    pub id: Field,
    pub doc_path: Field,
    pub parent_id: Field,
    pub title: Field,
    pub content: Field,
    pub user_id: Field,
    pub author_name: Field,
    pub status: Field,
    pub resolved: Field,
    pub created_at: Field,
}

/// Build the row schema.
///
/// All shards share one layout; a shard simply never populates the
/// columns its content type does not carry.
pub fn build_shard_schema() -> ShardSchema {
    let mut schema_builder = Schema::builder();

    // Key and filter columns, indexed untokenized
    let id = schema_builder.add_text_field("id", STRING | STORED);
    let doc_path = schema_builder.add_text_field("doc_path", STRING | STORED);
    let parent_id = schema_builder.add_text_field("parent_id", STRING | STORED);
    let user_id = schema_builder.add_text_field("user_id", STRING | STORED);
    let status = schema_builder.add_text_field("status", STRING | STORED);
    let resolved = schema_builder.add_bool_field("resolved", INDEXED | STORED);

    // Searchable text
    let title = schema_builder.add_text_field("title", TEXT | STORED);
    let content = schema_builder.add_text_field("content", TEXT | STORED);

    // Display only
    let author_name = schema_builder.add_text_field("author_name", STORED);

    // Epoch milliseconds
    let created_at = schema_builder.add_i64_field("created_at", INDEXED | STORED | FAST);

    ShardSchema {
        schema: schema_builder.build(),
        id,
        doc_path,
        parent_id,
        title,
        content,
        user_id,
        author_name,
        status,
        resolved,
        created_at,
    }
}

impl ShardSchema {
    /// Convert a row to a tantivy document
    pub fn to_tantivy_doc(&self, record: &IndexedRecord) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.id, &record.id);
        doc.add_text(self.doc_path, &record.doc_path);
        doc.add_text(self.content, &record.content);
        doc.add_i64(self.created_at, record.created_at.timestamp_millis());

        if let Some(ref parent_id) = record.parent_id {
            doc.add_text(self.parent_id, parent_id);
        }
        if let Some(ref title) = record.title {
            doc.add_text(self.title, title);
        }
        if let Some(ref user_id) = record.user_id {
            doc.add_text(self.user_id, user_id);
        }
        if let Some(ref author_name) = record.author_name {
            doc.add_text(self.author_name, author_name);
        }
        if let Some(ref status) = record.status {
            doc.add_text(self.status, status);
        }
        if let Some(resolved) = record.resolved {
            doc.add_bool(self.resolved, resolved);
        }

        doc
    }

    /// Rebuild a row from a stored tantivy document
    pub fn from_tantivy_doc(
        &self,
        content_type: ContentType,
        doc: &TantivyDocument,
    ) -> Result<IndexedRecord> {
        let id = text(doc, self.id)
            .ok_or_else(|| SearchError::Index(format!("{} row without id", content_type)))?;
        let created_at = doc
            .get_first(self.created_at)
            .and_then(|v| v.as_i64())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| {
                SearchError::Index(format!("{} row {} without created_at", content_type, id))
            })?;

        Ok(IndexedRecord {
            id,
            content_type,
            doc_path: text(doc, self.doc_path).unwrap_or_default(),
            parent_id: text(doc, self.parent_id),
            title: text(doc, self.title),
            content: text(doc, self.content).unwrap_or_default(),
            user_id: text(doc, self.user_id),
            author_name: text(doc, self.author_name),
            status: text(doc, self.status),
            resolved: doc.get_first(self.resolved).and_then(|v| v.as_bool()),
            created_at,
        })
    }
}

fn text(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_building() {
        let shard = build_shard_schema();
        assert!(shard.schema.get_field("id").is_ok());
        assert!(shard.schema.get_field("content").is_ok());
        assert!(shard.schema.get_field("resolved").is_ok());
        assert!(shard.schema.get_field("created_at").is_ok());
    }

    #[test]
    fn test_row_survives_document_conversion() {
        let shard = build_shard_schema();
        let created_at = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let record = IndexedRecord::comment("c1", "/guide.md", "Typo here", false, created_at)
            .with_author("u1", "Ada");

        let doc = shard.to_tantivy_doc(&record);
        let restored = shard.from_tantivy_doc(ContentType::Comment, &doc).unwrap();

        assert_eq!(restored, record);
    }
}
