//! Compact one-line-per-item content catalog.

use chrono::TimeZone;
use creatorlens_core::{format_thousands, truncate_chars, Limits};
use creatorlens_store::ContentItem;

const CATALOG_TRUNCATED_MARKER: &str = "\n\n[...catalog truncated to fit token limits]";
const NO_CONTENT: &str = "No content available.";

/// Build the full catalog block: one line per item, newest first (the
/// caller supplies items already sorted). Falls back to title or external
/// id when an item has no summary yet.
pub fn build_content_catalog(items: &[(ContentItem, String)], limits: &Limits) -> String {
    if items.is_empty() {
        return NO_CONTENT.to_string();
    }

    let lines: Vec<String> = items
        .iter()
        .map(|(item, label)| {
            let date_str = item
                .timestamp
                .and_then(|ts| chrono::Utc.timestamp_millis_opt(ts).single())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "?".to_string());
            // Summaries come from a model and may contain newlines;
            // flatten them so each item stays on one line.
            let summary = item
                .summary
                .as_deref()
                .or(item.title.as_deref())
                .unwrap_or(&item.external_id)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let url_str = item
                .url
                .as_deref()
                .map(|u| format!(" | {}", u))
                .unwrap_or_default();
            format!(
                "- [{}] [{}] {} ({} views, {} likes{})",
                label,
                date_str,
                summary,
                format_thousands(item.views),
                format_thousands(item.likes),
                url_str
            )
        })
        .collect();

    let catalog = lines.join("\n");
    if catalog.chars().count() > limits.max_catalog_chars {
        format!(
            "{}{}",
            truncate_chars(&catalog, limits.max_catalog_chars),
            CATALOG_TRUNCATED_MARKER
        )
    } else {
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, summary: Option<&str>, views: i64) -> (ContentItem, String) {
        (
            ContentItem {
                id,
                platform_id: 1,
                external_id: format!("ext{}", id),
                url: Some(format!("https://example.com/{}", id)),
                title: Some(format!("Video {}", id)),
                caption: None,
                transcript: None,
                transcript_source: None,
                timestamp: Some(1_750_000_000_000),
                likes: 1_234,
                comments: 0,
                views,
                duration: 0.0,
                is_embedded: false,
                summary: summary.map(|s| s.to_string()),
            },
            "instagram:alex".to_string(),
        )
    }

    #[test]
    fn test_catalog_line_format() {
        let catalog =
            build_content_catalog(&[item(1, Some("A quick recipe"), 1_500_000)], &Limits::default());
        assert_eq!(
            catalog,
            "- [instagram:alex] [2025-06-15] A quick recipe (1,500,000 views, 1,234 likes | https://example.com/1)"
        );
    }

    #[test]
    fn test_catalog_summary_fallback() {
        let catalog = build_content_catalog(&[item(2, None, 10)], &Limits::default());
        assert!(catalog.contains("Video 2 (10 views"));
    }

    #[test]
    fn test_catalog_one_line_per_item() {
        let items: Vec<_> = (0..5)
            .map(|i| item(i, Some("Summary with\nan embedded newline"), 100))
            .collect();
        let catalog = build_content_catalog(&items, &Limits::default());
        assert_eq!(catalog.lines().count(), items.len());
        assert!(catalog.lines().all(|l| l.starts_with("- [")));
    }

    #[test]
    fn test_catalog_empty() {
        assert_eq!(build_content_catalog(&[], &Limits::default()), NO_CONTENT);
    }

    #[test]
    fn test_catalog_truncation() {
        let items: Vec<_> = (0..100)
            .map(|i| item(i, Some("A fairly long summary string for this video"), 100))
            .collect();
        let mut limits = Limits::default();
        limits.max_catalog_chars = 300;
        let catalog = build_content_catalog(&items, &limits);
        assert!(catalog.ends_with("[...catalog truncated to fit token limits]"));
    }
}
