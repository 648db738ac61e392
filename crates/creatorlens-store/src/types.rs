//! Row types for the relational store.

use creatorlens_core::PlatformKind;
use serde::{Deserialize, Serialize};

/// A creator whose content is aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creator {
    pub id: i64,
    pub name: String,
    /// Always-available fallback for prompt composition; a bounded prefix
    /// of the profile artifact once the knowledge pipeline has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_generated_at: Option<i64>,
    pub created_at: i64,
}

/// A linked social platform account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: i64,
    pub creator_id: i64,
    pub kind: PlatformKind,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_scraped_at: Option<i64>,
}

impl Platform {
    /// Label used in catalogs and context records, e.g. `youtube:mkbhd`.
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind, self.handle)
    }
}

/// One scraped post/video with engagement metrics and text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub platform_id: i64,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_source: Option<String>,
    /// Source-provided publish time (unix millis), absent for some items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
    pub duration: f64,
    pub is_embedded: bool,
    /// AI-generated 1-2 sentence summary; written only by the knowledge
    /// pipeline, never by retrieval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// An ordered conversation owned by a creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub creator_id: i64,
    pub title: String,
    pub created_at: i64,
}

/// One conversation turn. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

/// Kind of derived knowledge artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeKind {
    Profile,
    Topics,
    Style,
}

impl KnowledgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeKind::Profile => "profile",
            KnowledgeKind::Topics => "topics",
            KnowledgeKind::Style => "style",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(KnowledgeKind::Profile),
            "topics" => Some(KnowledgeKind::Topics),
            "style" => Some(KnowledgeKind::Style),
            _ => None,
        }
    }
}

impl std::fmt::Display for KnowledgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A versioned, creator-scoped derived text blob.
///
/// At most one row per (creator, kind); regeneration increments `version`
/// and overwrites `content` in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatorKnowledge {
    pub id: i64,
    pub creator_id: i64,
    pub kind: KnowledgeKind,
    pub content: String,
    pub generated_at: i64,
    pub version: i64,
}

/// Scrape run bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: i64,
    pub creator_id: i64,
    /// `running`, `completed`, or `failed`.
    pub status: String,
    pub new_items_found: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Aggregate engagement stats across a creator's content.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CreatorStats {
    #[serde(rename = "totalItems")]
    pub total_items: i64,
    #[serde(rename = "totalViews")]
    pub total_views: i64,
    #[serde(rename = "avgViews")]
    pub avg_views: i64,
    #[serde(rename = "avgLikes")]
    pub avg_likes: i64,
    #[serde(rename = "avgComments")]
    pub avg_comments: i64,
}

/// Sortable columns for content listings. Query parameters are parsed
/// through this whitelist so user input never reaches the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSort {
    Timestamp,
    Likes,
    Views,
    Comments,
    Duration,
}

impl ContentSort {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "timestamp" => Some(Self::Timestamp),
            "likes" => Some(Self::Likes),
            "views" => Some(Self::Views),
            "comments" => Some(Self::Comments),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Likes => "likes",
            Self::Views => "views",
            Self::Comments => "comments",
            Self::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Pagination and ordering for content listings.
#[derive(Debug, Clone, Copy)]
pub struct ContentQuery {
    pub platform: Option<PlatformKind>,
    pub sort: ContentSort,
    pub order: SortOrder,
    pub limit: usize,
    pub offset: usize,
}

impl Default for ContentQuery {
    fn default() -> Self {
        Self {
            platform: None,
            sort: ContentSort::Timestamp,
            order: SortOrder::Desc,
            limit: 500,
            offset: 0,
        }
    }
}
