//! Document text construction for embedding.

use chrono::TimeZone;
use creatorlens_core::truncate_chars;
use creatorlens_store::ContentItem;

const MAX_CAPTION_CHARS: usize = 2_000;
const MAX_TRANSCRIPT_CHARS: usize = 4_000;

/// Build the rich text embedded for a content item. `platform_label` is
/// the "kind:handle" label of the item's platform.
pub fn build_document_text(item: &ContentItem, platform_label: &str) -> String {
    let mut parts = vec![format!("[{}]", platform_label)];

    if let Some(title) = &item.title {
        parts.push(format!("Title: {}", title));
    }
    if let Some(caption) = &item.caption {
        parts.push(format!(
            "Caption: {}",
            truncate_chars(caption, MAX_CAPTION_CHARS)
        ));
    }
    // Instagram scrapes often reuse the caption as the transcript; skip
    // the duplicate text in that case.
    if let Some(transcript) = &item.transcript {
        if item.caption.as_deref() != Some(transcript.as_str()) {
            parts.push(format!(
                "Transcript: {}",
                truncate_chars(transcript, MAX_TRANSCRIPT_CHARS)
            ));
        }
    }

    parts.push(format!(
        "Stats: {} views, {} likes, {} comments, {}s",
        item.views, item.likes, item.comments, item.duration
    ));

    if let Some(ts) = item.timestamp {
        if let Some(date) = chrono::Utc.timestamp_millis_opt(ts).single() {
            parts.push(format!("Date: {}", date.format("%Y-%m-%d")));
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ContentItem {
        ContentItem {
            id: 1,
            platform_id: 1,
            external_id: "v1".to_string(),
            url: None,
            title: Some("How I edit".to_string()),
            caption: Some("My editing workflow".to_string()),
            transcript: Some("Today we look at editing".to_string()),
            transcript_source: None,
            timestamp: Some(1_750_000_000_000),
            likes: 5,
            comments: 1,
            views: 100,
            duration: 30.0,
            is_embedded: false,
            summary: None,
        }
    }

    #[test]
    fn test_document_includes_all_sections() {
        let doc = build_document_text(&item(), "youtube:alex");
        assert!(doc.starts_with("[youtube:alex]"));
        assert!(doc.contains("Title: How I edit"));
        assert!(doc.contains("Caption: My editing workflow"));
        assert!(doc.contains("Transcript: Today we look at editing"));
        assert!(doc.contains("Stats: 100 views, 5 likes, 1 comments, 30s"));
        assert!(doc.contains("Date: 2025-06-15"));
    }

    #[test]
    fn test_transcript_equal_to_caption_is_skipped() {
        let mut it = item();
        it.transcript = it.caption.clone();
        let doc = build_document_text(&it, "instagram:alex");
        assert!(!doc.contains("Transcript:"));
    }
}
