use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// The five searchable content types of the review system.
///
/// Each type owns a dedicated shard in the text index.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ContentType {
    #[serde(alias = "documents")]
    #[strum(to_string = "document", serialize = "documents")]
    Document,
    #[serde(alias = "comments")]
    #[strum(to_string = "comment", serialize = "comments")]
    Comment,
    #[serde(alias = "suggestions")]
    #[strum(to_string = "suggestion", serialize = "suggestions")]
    Suggestion,
    #[serde(alias = "discussions")]
    #[strum(to_string = "discussion", serialize = "discussions")]
    Discussion,
    #[serde(alias = "messages")]
    #[strum(to_string = "message", serialize = "messages")]
    Message,
}

/// How a shard stores the status of its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColumn {
    /// No status attribute at all
    Absent,
    /// Boolean `resolved` flag, exposed as `open` / `resolved`
    ResolvedFlag,
    /// Free-form status string
    Text,
}

/// Denormalized filter columns a shard carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardColumns {
    pub user_id: bool,
    pub status: StatusColumn,
}

impl ContentType {
    /// All content types, in shard order
    pub const ALL: [ContentType; 5] = [
        ContentType::Document,
        ContentType::Comment,
        ContentType::Suggestion,
        ContentType::Discussion,
        ContentType::Message,
    ];

    /// Name of the shard holding this type (used for index directories)
    pub fn shard_name(self) -> &'static str {
        match self {
            ContentType::Document => "documents",
            ContentType::Comment => "comments",
            ContentType::Suggestion => "suggestions",
            ContentType::Discussion => "discussions",
            ContentType::Message => "messages",
        }
    }

    /// Filter columns carried by this type's shard
    pub const fn columns(self) -> ShardColumns {
        match self {
            ContentType::Document => ShardColumns {
                user_id: false,
                status: StatusColumn::Absent,
            },
            ContentType::Comment => ShardColumns {
                user_id: true,
                status: StatusColumn::ResolvedFlag,
            },
            ContentType::Suggestion | ContentType::Discussion => ShardColumns {
                user_id: true,
                status: StatusColumn::Text,
            },
            ContentType::Message => ShardColumns {
                user_id: true,
                status: StatusColumn::Absent,
            },
        }
    }
}

/// The `type` filter of a search request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TypeFilter {
    #[default]
    All,
    #[serde(alias = "document")]
    #[strum(to_string = "documents", serialize = "document")]
    Documents,
    #[serde(alias = "comment")]
    #[strum(to_string = "comments", serialize = "comment")]
    Comments,
    #[serde(alias = "suggestion")]
    #[strum(to_string = "suggestions", serialize = "suggestion")]
    Suggestions,
    #[serde(alias = "discussion")]
    #[strum(to_string = "discussions", serialize = "discussion")]
    Discussions,
    #[serde(alias = "message")]
    #[strum(to_string = "messages", serialize = "message")]
    Messages,
}

impl TypeFilter {
    /// Shards that must be queried for this filter.
    ///
    /// Messages are children of discussions and are always searched with them.
    pub fn shards(self) -> Vec<ContentType> {
        match self {
            TypeFilter::All => ContentType::ALL.to_vec(),
            TypeFilter::Documents => vec![ContentType::Document],
            TypeFilter::Comments => vec![ContentType::Comment],
            TypeFilter::Suggestions => vec![ContentType::Suggestion],
            TypeFilter::Discussions => vec![ContentType::Discussion, ContentType::Message],
            TypeFilter::Messages => vec![ContentType::Message],
        }
    }

    /// Label recorded as the query type in analytics
    pub fn label(self) -> &'static str {
        match self {
            TypeFilter::All => "all",
            TypeFilter::Documents => "documents",
            TypeFilter::Comments => "comments",
            TypeFilter::Suggestions => "suggestions",
            TypeFilter::Discussions => "discussions",
            TypeFilter::Messages => "messages",
        }
    }
}

/// One row of a shard.
///
/// Rows are always written whole (delete-then-insert), never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    /// Canonical entity id, unique within the shard
    pub id: String,

    /// Shard this row belongs to
    #[serde(rename = "type")]
    pub content_type: ContentType,

    /// Path of the reviewed document this row belongs to
    pub doc_path: String,

    /// Parent discussion id (messages only)
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Searchable title, where the type has one
    #[serde(default)]
    pub title: Option<String>,

    /// Searchable body text
    pub content: String,

    /// Author's user id
    #[serde(default)]
    pub user_id: Option<String>,

    /// Author's display name, denormalized from the user table
    #[serde(default)]
    pub author_name: Option<String>,

    /// Free-form status (suggestions, discussions)
    #[serde(default)]
    pub status: Option<String>,

    /// Resolution flag (comments)
    #[serde(default)]
    pub resolved: Option<bool>,

    pub created_at: DateTime<Utc>,
}

impl IndexedRecord {
    fn base(
        content_type: ContentType,
        id: impl Into<String>,
        doc_path: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            content_type,
            doc_path: doc_path.into(),
            parent_id: None,
            title: None,
            content: content.into(),
            user_id: None,
            author_name: None,
            status: None,
            resolved: None,
            created_at,
        }
    }

    pub fn document(
        id: impl Into<String>,
        doc_path: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::base(ContentType::Document, id, doc_path, content, created_at);
        record.title = Some(title.into());
        record
    }

    pub fn comment(
        id: impl Into<String>,
        doc_path: impl Into<String>,
        content: impl Into<String>,
        resolved: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::base(ContentType::Comment, id, doc_path, content, created_at);
        record.resolved = Some(resolved);
        record
    }

    pub fn suggestion(
        id: impl Into<String>,
        doc_path: impl Into<String>,
        content: impl Into<String>,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::base(ContentType::Suggestion, id, doc_path, content, created_at);
        record.status = Some(status.into());
        record
    }

    pub fn discussion(
        id: impl Into<String>,
        doc_path: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::base(ContentType::Discussion, id, doc_path, content, created_at);
        record.title = Some(title.into());
        record.status = Some(status.into());
        record
    }

    pub fn message(
        id: impl Into<String>,
        discussion_id: impl Into<String>,
        doc_path: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::base(ContentType::Message, id, doc_path, content, created_at);
        record.parent_id = Some(discussion_id.into());
        record
    }

    /// Attach the author
    pub fn with_author(mut self, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self.author_name = Some(name.into());
        self
    }

    /// Drop filter columns the row's shard does not carry.
    pub fn for_shard(mut self) -> Self {
        let columns = self.content_type.columns();
        if !columns.user_id {
            self.user_id = None;
        }
        match columns.status {
            StatusColumn::Absent => {
                self.status = None;
                self.resolved = None;
            }
            StatusColumn::ResolvedFlag => self.status = None,
            StatusColumn::Text => self.resolved = None,
        }
        self
    }

    /// Status as reported in search results
    pub fn display_status(&self) -> Option<String> {
        match self.content_type.columns().status {
            StatusColumn::Absent => None,
            StatusColumn::ResolvedFlag => self
                .resolved
                .map(|resolved| if resolved { "resolved" } else { "open" }.to_string()),
            StatusColumn::Text => self.status.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_content_type_parsing_accepts_plurals() {
        assert_eq!(ContentType::from_str("comment").unwrap(), ContentType::Comment);
        assert_eq!(ContentType::from_str("Comments").unwrap(), ContentType::Comment);
        assert_eq!(ContentType::Message.to_string(), "message");
    }

    #[test]
    fn test_discussions_filter_includes_messages() {
        assert_eq!(
            TypeFilter::Discussions.shards(),
            vec![ContentType::Discussion, ContentType::Message]
        );
        assert_eq!(TypeFilter::All.shards().len(), 5);
        assert_eq!(TypeFilter::from_str("comment").unwrap(), TypeFilter::Comments);
    }

    #[test]
    fn test_for_shard_strips_uncarried_columns() {
        let doc = IndexedRecord::document("d1", "/a.md", "Title", "Body", Utc::now())
            .with_author("u1", "Ada");
        let doc = doc.for_shard();
        assert!(doc.user_id.is_none());
        assert_eq!(doc.author_name.as_deref(), Some("Ada"));

        let comment = IndexedRecord::comment("c1", "/a.md", "Body", true, Utc::now());
        assert_eq!(comment.display_status().as_deref(), Some("resolved"));
    }
}
