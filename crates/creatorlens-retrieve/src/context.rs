//! Full-transcript context assembly for the system prompt.

use std::collections::HashSet;

use chrono::TimeZone;
use creatorlens_core::{truncate_chars, Limits};
use creatorlens_store::ContentItem;

const CAPTION_LIMIT: usize = 1_000;
const CONTEXT_TRUNCATED_MARKER: &str = "\n\n[Transcripts truncated to fit token limits]";
const NO_MATCH_FALLBACK: &str =
    "No specific transcripts matched this query. Refer to the content catalog and creator knowledge above.";

/// Format a content item with its full transcript for the model context.
pub fn format_item_full(item: &ContentItem, platform_label: &str, transcript_limit: usize) -> String {
    let mut parts = vec![format!(
        "[{}] {}",
        platform_label,
        item.title.as_deref().unwrap_or(&item.external_id)
    )];
    if let Some(url) = &item.url {
        parts.push(format!("URL: {}", url));
    }
    parts.push(format!(
        "Stats: {} views, {} likes, {} comments",
        item.views, item.likes, item.comments
    ));
    if let Some(ts) = item.timestamp {
        if let Some(date) = chrono::Utc.timestamp_millis_opt(ts).single() {
            parts.push(format!("Date: {}", date.format("%Y-%m-%d")));
        }
    }
    if let Some(caption) = &item.caption {
        parts.push(format!("Caption: {}", truncate_chars(caption, CAPTION_LIMIT)));
    }
    if let Some(transcript) = &item.transcript {
        if item.caption.as_deref() != Some(transcript.as_str()) {
            parts.push(format!(
                "Full Transcript: {}",
                truncate_chars(transcript, transcript_limit)
            ));
        }
    }
    parts.join("\n")
}

/// Assemble the retrieved-transcripts block from keyword and semantic
/// hits. Semantic hits already present among the keyword hits are
/// dropped. The result is capped at `max_context_chars` with a visible
/// truncation marker.
pub fn build_context(
    keyword_hits: &[(ContentItem, String)],
    semantic_hits: &[(ContentItem, String)],
    limits: &Limits,
) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut seen_ids: HashSet<i64> = HashSet::new();

    if !keyword_hits.is_empty() {
        parts.push("### Keyword-Matched Transcripts".to_string());
        for (item, label) in keyword_hits {
            parts.push(format_item_full(item, label, limits.max_transcript_per_item));
            parts.push("---".to_string());
            seen_ids.insert(item.id);
        }
    }

    let semantic_new: Vec<&(ContentItem, String)> = semantic_hits
        .iter()
        .filter(|(item, _)| seen_ids.insert(item.id))
        .collect();
    if !semantic_new.is_empty() {
        parts.push("\n### Semantically Relevant Transcripts".to_string());
        for (item, label) in semantic_new {
            parts.push(format_item_full(item, label, limits.max_transcript_per_item));
            parts.push("---".to_string());
        }
    }

    if parts.is_empty() {
        parts.push(NO_MATCH_FALLBACK.to_string());
    }

    let context = parts.join("\n");
    if context.chars().count() > limits.max_context_chars {
        format!(
            "{}{}",
            truncate_chars(&context, limits.max_context_chars),
            CONTEXT_TRUNCATED_MARKER
        )
    } else {
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, transcript: &str) -> ContentItem {
        ContentItem {
            id,
            platform_id: 1,
            external_id: format!("ext{}", id),
            url: Some(format!("https://example.com/{}", id)),
            title: Some(format!("Video {}", id)),
            caption: Some("caption text".to_string()),
            transcript: Some(transcript.to_string()),
            transcript_source: None,
            timestamp: None,
            likes: 3,
            comments: 1,
            views: 50,
            duration: 10.0,
            is_embedded: false,
            summary: None,
        }
    }

    fn labeled(id: i64, transcript: &str) -> (ContentItem, String) {
        (item(id, transcript), "youtube:alex".to_string())
    }

    #[test]
    fn test_format_item_full_sections() {
        let formatted = format_item_full(&item(1, "spoken words"), "youtube:alex", 8000);
        assert!(formatted.starts_with("[youtube:alex] Video 1"));
        assert!(formatted.contains("URL: https://example.com/1"));
        assert!(formatted.contains("Stats: 50 views, 3 likes, 1 comments"));
        assert!(formatted.contains("Caption: caption text"));
        assert!(formatted.contains("Full Transcript: spoken words"));
    }

    #[test]
    fn test_context_sections_and_dedupe() {
        let keyword = vec![labeled(1, "first"), labeled(2, "second")];
        // Item 1 also comes back from semantic search; only item 3 is new
        let semantic = vec![labeled(1, "first"), labeled(3, "third")];
        let context = build_context(&keyword, &semantic, &Limits::default());

        assert!(context.contains("### Keyword-Matched Transcripts"));
        assert!(context.contains("### Semantically Relevant Transcripts"));
        assert_eq!(context.matches("Video 1").count(), 1);
        assert!(context.contains("Video 3"));
    }

    #[test]
    fn test_context_fallback_when_empty() {
        let context = build_context(&[], &[], &Limits::default());
        assert!(context.contains("No specific transcripts matched this query"));
    }

    #[test]
    fn test_context_truncation_marker() {
        let long = "word ".repeat(20_000);
        let keyword = vec![labeled(1, &long), labeled(2, &long)];
        let mut limits = Limits::default();
        limits.max_context_chars = 500;
        let context = build_context(&keyword, &[], &limits);
        assert!(context.ends_with("[Transcripts truncated to fit token limits]"));
        assert!(context.chars().count() <= 500 + CONTEXT_TRUNCATED_MARKER.chars().count());
    }
}
