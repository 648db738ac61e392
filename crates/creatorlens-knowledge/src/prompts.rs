//! Prompt construction for each pipeline stage.

use chrono::TimeZone;
use creatorlens_core::{format_thousands, truncate_chars};
use creatorlens_store::ContentItem;

const SUMMARY_CAPTION_CHARS: usize = 500;
const SUMMARY_TRANSCRIPT_CHARS: usize = 1_500;
const SUMMARY_LINE_CHARS: usize = 200;
const MAX_SUMMARY_LINES: usize = 300;
const STYLE_TRANSCRIPT_CHARS: usize = 2_000;

/// Batch summarization prompt. The model is asked for a strict JSON
/// array keyed by item id so responses survive reordering.
pub fn summary_batch_prompt(batch: &[ContentItem]) -> String {
    let video_texts: Vec<String> = batch
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut text = format!("VIDEO {} (ID: {}):\n", i + 1, item.id);
            if let Some(title) = &item.title {
                text.push_str(&format!("Title: {}\n", title));
            }
            if let Some(caption) = &item.caption {
                text.push_str(&format!(
                    "Caption: {}\n",
                    truncate_chars(caption, SUMMARY_CAPTION_CHARS)
                ));
            }
            if let Some(transcript) = &item.transcript {
                if item.caption.as_deref() != Some(transcript.as_str()) {
                    text.push_str(&format!(
                        "Transcript: {}\n",
                        truncate_chars(transcript, SUMMARY_TRANSCRIPT_CHARS)
                    ));
                }
            }
            text.push_str(&format!("Stats: {} views, {} likes", item.views, item.likes));
            text
        })
        .collect();

    format!(
        "Summarize each video in 1-2 sentences. Focus on the main topic and key takeaway.\n\n\
         {}\n\n\
         Respond with a JSON array of objects: [{{\"id\": <video_id>, \"summary\": \"<1-2 sentence summary>\"}}]\n\
         Return ONLY the JSON array, no other text.",
        video_texts.join("\n")
    )
}

/// Topic-cluster analysis over every item's one-line summary.
pub fn topics_prompt(items: &[ContentItem], creator_name: &str) -> String {
    let mut summary_lines: Vec<String> = Vec::new();
    for item in items {
        let s = item
            .summary
            .as_deref()
            .or(item.caption.as_deref())
            .or(item.title.as_deref())
            .unwrap_or("");
        if s.is_empty() {
            continue;
        }
        let views = if item.views > 0 {
            format!(" ({} views)", item.views)
        } else {
            String::new()
        };
        summary_lines.push(format!("- {}{}", truncate_chars(s, SUMMARY_LINE_CHARS), views));
    }
    let shown = summary_lines.len().min(MAX_SUMMARY_LINES);

    format!(
        "Analyze the following {} video summaries from creator \"{}\" and identify the 5-10 major topic clusters/themes.\n\n\
         Video summaries:\n{}\n\n\
         For each cluster, provide:\n\
         1. Theme name\n\
         2. Description (2-3 sentences)\n\
         3. Approximate number of videos in this theme\n\
         4. Example video topics\n\n\
         Format as a structured analysis. Be specific to this creator's actual content.",
        summary_lines.len(),
        creator_name,
        summary_lines[..shown].join("\n")
    )
}

/// Deep creator profile, grounded in aggregate stats, the topic
/// clusters, and the top-performing items.
pub fn profile_prompt(items: &[ContentItem], creator_name: &str, clusters: &str) -> String {
    let total = items.len() as i64;
    let total_views: i64 = items.iter().map(|i| i.views).sum();
    let avg_views = if total > 0 { total_views / total } else { 0 };
    let avg_likes = if total > 0 {
        items.iter().map(|i| i.likes).sum::<i64>() / total
    } else {
        0
    };

    let mut by_views: Vec<&ContentItem> = items.iter().collect();
    by_views.sort_by(|a, b| b.views.cmp(&a.views));
    let top_summaries: Vec<String> = by_views
        .iter()
        .take(15)
        .map(|i| {
            format!(
                "- [{} views] {}",
                i.views,
                i.summary
                    .as_deref()
                    .or(i.title.as_deref())
                    .unwrap_or(&i.external_id)
            )
        })
        .collect();

    format!(
        "Create a comprehensive creator profile for \"{}\" based on their full content library.\n\n\
         Stats: {} videos, {} total views, {} avg views, {} avg likes\n\n\
         Topic clusters already identified:\n{}\n\n\
         Top performing content:\n{}\n\n\
         Write a comprehensive profile covering:\n\
         1. **Brand Identity**: Who they are, what they stand for, their niche\n\
         2. **Content Strategy**: How they structure content, posting patterns, series/recurring formats\n\
         3. **Target Audience**: Who watches, what problems they solve, audience demographics/interests\n\
         4. **Key Strengths**: What makes their content effective, unique differentiators\n\
         5. **Growth Opportunities**: Gaps in content, underexplored themes, potential improvements\n\n\
         Be specific and reference actual content patterns. This profile will be used as context for an AI assistant answering questions about this creator.",
        creator_name,
        total,
        format_thousands(total_views),
        format_thousands(avg_views),
        format_thousands(avg_likes),
        clusters,
        top_summaries.join("\n")
    )
}

/// Pick diverse transcript samples: top 5 by views, the 5 most recent,
/// and 5 from the middle of the views ranking, deduplicated, capped at
/// 15, transcript required.
pub fn style_samples(items: &[ContentItem]) -> Vec<&ContentItem> {
    let mut by_views: Vec<&ContentItem> = items.iter().collect();
    by_views.sort_by(|a, b| b.views.cmp(&a.views));
    let mut by_date: Vec<&ContentItem> = items.iter().collect();
    by_date.sort_by(|a, b| b.timestamp.unwrap_or(i64::MIN).cmp(&a.timestamp.unwrap_or(i64::MIN)));

    let top5 = by_views.iter().take(5);
    let recent5 = by_date.iter().take(5);
    let mid_start = (by_views.len() / 2).saturating_sub(2);
    let middle5 = by_views.iter().skip(mid_start).take(5);

    let mut seen = std::collections::HashSet::new();
    let mut samples = Vec::new();
    for item in top5.chain(recent5).chain(middle5) {
        if seen.insert(item.id) && item.transcript.is_some() {
            samples.push(*item);
        }
        if samples.len() >= 15 {
            break;
        }
    }
    samples
}

/// Style analysis prompt over the sampled transcripts.
pub fn style_prompt(samples: &[&ContentItem], creator_name: &str) -> String {
    let transcript_texts: Vec<String> = samples
        .iter()
        .map(|item| {
            let t = item
                .transcript
                .as_deref()
                .map(|t| truncate_chars(t, STYLE_TRANSCRIPT_CHARS))
                .unwrap_or("");
            let date = item
                .timestamp
                .and_then(|ts| chrono::Utc.timestamp_millis_opt(ts).single())
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "no date".to_string());
            format!("--- [{} views, {}] ---\n{}", item.views, date, t)
        })
        .collect();

    format!(
        "Analyze the speaking/content style of creator \"{}\" based on these {} transcript samples.\n\n\
         {}\n\n\
         Provide a detailed style analysis covering:\n\
         1. **Tone & Voice**: Formal/casual, authoritative/conversational, humor style\n\
         2. **Vocabulary**: Common phrases, catchphrases, jargon level, unique expressions\n\
         3. **Hook Patterns**: How they open videos, attention-grabbing techniques\n\
         4. **CTA Patterns**: How they end videos, calls to action, engagement prompts\n\
         5. **Format Structure**: Typical video structure (intro/body/outro patterns)\n\
         6. **Storytelling Techniques**: How they present information, use of examples/analogies\n\
         7. **Engagement Tactics**: Questions, challenges, community references\n\n\
         Be specific with examples from the transcripts. This will help an AI assistant match and understand this creator's style.",
        creator_name,
        samples.len(),
        transcript_texts.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, views: i64, timestamp: Option<i64>, transcript: Option<&str>) -> ContentItem {
        ContentItem {
            id,
            platform_id: 1,
            external_id: format!("ext{}", id),
            url: None,
            title: Some(format!("Video {}", id)),
            caption: Some(format!("Caption {}", id)),
            transcript: transcript.map(|t| t.to_string()),
            transcript_source: None,
            timestamp,
            likes: 1,
            comments: 0,
            views,
            duration: 0.0,
            is_embedded: false,
            summary: None,
        }
    }

    #[test]
    fn test_summary_batch_prompt_layout() {
        let batch = vec![item(7, 100, None, Some("spoken"))];
        let prompt = summary_batch_prompt(&batch);
        assert!(prompt.contains("VIDEO 1 (ID: 7):"));
        assert!(prompt.contains("Title: Video 7"));
        assert!(prompt.contains("Transcript: spoken"));
        assert!(prompt.contains("Stats: 100 views, 1 likes"));
        assert!(prompt.contains("Return ONLY the JSON array"));
    }

    #[test]
    fn test_topics_prompt_skips_blank_items() {
        let mut blank = item(1, 0, None, None);
        blank.title = None;
        blank.caption = None;
        let items = vec![blank, item(2, 10, None, None)];
        let prompt = topics_prompt(&items, "Alex");
        assert!(prompt.contains("the following 1 video summaries"));
        assert!(prompt.contains("- Caption 2 (10 views)"));
    }

    #[test]
    fn test_style_samples_dedupe_and_transcript_filter() {
        // 20 items; only even ids have transcripts
        let items: Vec<ContentItem> = (1..=20)
            .map(|i| {
                item(
                    i,
                    i * 10,
                    Some(i * 1000),
                    (i % 2 == 0).then_some("words"),
                )
            })
            .collect();
        let samples = style_samples(&items);
        assert!(samples.len() <= 15);
        assert!(samples.iter().all(|s| s.transcript.is_some()));
        let mut ids: Vec<i64> = samples.iter().map(|s| s.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), samples.len());
    }

    #[test]
    fn test_style_samples_empty_without_transcripts() {
        let items = vec![item(1, 5, None, None)];
        assert!(style_samples(&items).is_empty());
    }
}
