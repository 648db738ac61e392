//! Scraper seam — the closed platform variant and the adapter trait.
//!
//! Platform adapters (Instagram, YouTube) live outside this workspace;
//! the core only defines the shape of what they hand back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Supported content platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Instagram,
    YouTube,
}

impl PlatformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Instagram => "instagram",
            PlatformKind::YouTube => "youtube",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "instagram" => Some(PlatformKind::Instagram),
            "youtube" => Some(PlatformKind::YouTube),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A freshly scraped content item, not yet persisted.
///
/// Transient per-fetch data (pending media URLs, download handles) stays in
/// the adapter; only these fields cross the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentItem {
    pub external_id: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub caption: Option<String>,
    pub transcript: Option<String>,
    /// Where the transcript came from: native captions, whisper, fallback.
    pub transcript_source: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub likes: i64,
    pub comments: i64,
    pub views: i64,
    pub duration: f64,
}

/// A platform adapter that can fetch a handle's latest content.
///
/// Implementations guarantee external-id-stable records; dedup against
/// already-stored items is the caller's job.
#[async_trait]
pub trait ContentSource: Send + Sync {
    fn platform(&self) -> PlatformKind;

    async fn fetch_new_items(&self, handle: &str) -> Result<Vec<NewContentItem>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_kind_roundtrip() {
        assert_eq!(PlatformKind::parse("instagram"), Some(PlatformKind::Instagram));
        assert_eq!(PlatformKind::parse("youtube"), Some(PlatformKind::YouTube));
        assert_eq!(PlatformKind::parse("tiktok"), None);
        assert_eq!(PlatformKind::Instagram.as_str(), "instagram");
    }
}
