//! The four-stage knowledge generation pipeline.

use std::sync::Arc;
use std::time::Duration;

use creatorlens_core::{truncate_chars, Limits, Result};
use creatorlens_llm::{ChatModel, ChatTurn};
use creatorlens_store::{ContentItem, KnowledgeKind, SqliteStore};
use futures::Stream;
use serde::Deserialize;
use tracing::{info, warn};

use crate::events::{ProgressEvent, Stage};
use crate::prompts;

const SUMMARY_MAX_TOKENS: usize = 2_000;
const TOPICS_MAX_TOKENS: usize = 3_000;
const PROFILE_MAX_TOKENS: usize = 4_000;
const STYLE_MAX_TOKENS: usize = 4_000;

/// Fallback summary length when the model response is unusable.
const FALLBACK_SUMMARY_CHARS: usize = 200;
/// Profile prefix copied onto the creator row.
const CREATOR_SUMMARY_CHARS: usize = 2_000;

const NO_TRANSCRIPTS_STYLE: &str = "Insufficient transcript data for style analysis.";

#[derive(Deserialize)]
struct SummaryEntry {
    id: i64,
    summary: String,
}

/// Orchestrates knowledge generation against the store and a chat model.
pub struct KnowledgePipeline {
    store: Arc<SqliteStore>,
    model: Arc<dyn ChatModel>,
    limits: Limits,
}

impl KnowledgePipeline {
    pub fn new(store: Arc<SqliteStore>, model: Arc<dyn ChatModel>, limits: Limits) -> Self {
        Self {
            store,
            model,
            limits,
        }
    }

    /// Run the full pipeline, yielding progress events. Summaries take the
    /// first half of the progress range since they dominate wall time.
    pub fn generate_all(&self, creator_id: i64) -> impl Stream<Item = ProgressEvent> + Send + '_ {
        async_stream::stream! {
            let creator = match self.store.get_creator(creator_id) {
                Ok(Some(c)) => c,
                Ok(None) => {
                    yield ProgressEvent::error("Creator not found");
                    return;
                }
                Err(e) => {
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };

            let platforms = match self.store.platforms_for_creator(creator_id) {
                Ok(p) => p,
                Err(e) => {
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };
            if platforms.is_empty() {
                yield ProgressEvent::error("No platforms linked");
                return;
            }

            let items = match self.store.items_for_creator(creator_id) {
                Ok(i) => i,
                Err(e) => {
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };
            if items.is_empty() {
                yield ProgressEvent::error("No content items found");
                return;
            }

            // Stage 1: per-video summaries
            yield ProgressEvent::new(
                Stage::Summaries,
                format!("Generating video summaries ({} items)...", items.len()),
                0.025,
            );

            let unsummarized: Vec<ContentItem> =
                items.iter().filter(|i| i.summary.is_none()).cloned().collect();
            if unsummarized.is_empty() {
                yield ProgressEvent::new(Stage::Summaries, "All videos already summarized", 0.5);
            } else {
                let batch_size = self.limits.summary_batch_size;
                let total_batches = unsummarized.len().div_ceil(batch_size);

                for (batch_idx, batch) in unsummarized.chunks(batch_size).enumerate() {
                    if let Err(e) = self.summarize_batch(batch).await {
                        warn!("Summary batch {} failed: {}", batch_idx, e);
                        self.apply_fallback_summaries(batch);
                    }

                    let done = ((batch_idx + 1) * batch_size).min(unsummarized.len());
                    let batch_progress = (batch_idx + 1) as f64 / total_batches as f64;
                    yield ProgressEvent::new(
                        Stage::Summaries,
                        format!("Summarized {}/{} videos", done, unsummarized.len()),
                        batch_progress * 0.5,
                    );

                    if batch_idx + 1 < total_batches {
                        tokio::time::sleep(Duration::from_secs_f64(
                            self.limits.rate_limit_delay_secs,
                        ))
                        .await;
                    }
                }
            }

            // Stage 2: topic clusters (over refreshed summaries)
            yield ProgressEvent::new(Stage::Topics, "Analyzing topic clusters...", 0.55);
            let items = match self.store.items_for_creator(creator_id) {
                Ok(i) => i,
                Err(e) => {
                    yield ProgressEvent::error(e.to_string());
                    return;
                }
            };
            let clusters = match self
                .model
                .complete(
                    vec![ChatTurn::user(prompts::topics_prompt(&items, &creator.name))],
                    TOPICS_MAX_TOKENS,
                )
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    yield ProgressEvent::error(format!("Topic analysis failed: {}", e));
                    return;
                }
            };
            if let Err(e) = self.store.upsert_knowledge(creator_id, KnowledgeKind::Topics, &clusters) {
                yield ProgressEvent::error(e.to_string());
                return;
            }
            yield ProgressEvent::new(Stage::Topics, "Topic clusters complete", 0.7);

            // Stage 3: creator profile
            yield ProgressEvent::new(Stage::Profile, "Building creator profile...", 0.72);
            let profile = match self
                .model
                .complete(
                    vec![ChatTurn::user(prompts::profile_prompt(
                        &items,
                        &creator.name,
                        &clusters,
                    ))],
                    PROFILE_MAX_TOKENS,
                )
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    yield ProgressEvent::error(format!("Profile generation failed: {}", e));
                    return;
                }
            };
            if let Err(e) = self.store.upsert_knowledge(creator_id, KnowledgeKind::Profile, &profile) {
                yield ProgressEvent::error(e.to_string());
                return;
            }
            yield ProgressEvent::new(Stage::Profile, "Creator profile complete", 0.85);

            // Stage 4: style analysis
            yield ProgressEvent::new(Stage::Style, "Analyzing content style...", 0.87);
            let samples = prompts::style_samples(&items);
            let style = if samples.is_empty() {
                NO_TRANSCRIPTS_STYLE.to_string()
            } else {
                match self
                    .model
                    .complete(
                        vec![ChatTurn::user(prompts::style_prompt(&samples, &creator.name))],
                        STYLE_MAX_TOKENS,
                    )
                    .await
                {
                    Ok(s) => s,
                    Err(e) => {
                        yield ProgressEvent::error(format!("Style analysis failed: {}", e));
                        return;
                    }
                }
            };
            if let Err(e) = self.store.upsert_knowledge(creator_id, KnowledgeKind::Style, &style) {
                yield ProgressEvent::error(e.to_string());
                return;
            }
            yield ProgressEvent::new(Stage::Style, "Style analysis complete", 0.95);

            // Mirror the profile's opening onto the creator row for cheap display
            if let Err(e) = self
                .store
                .update_creator_summary(creator_id, truncate_chars(&profile, CREATOR_SUMMARY_CHARS))
            {
                warn!("Failed to update creator summary: {}", e);
            }

            info!("Knowledge generation complete for creator {}", creator_id);
            yield ProgressEvent::new(Stage::Done, "Knowledge generation complete!", 1.0);
        }
    }

    /// Summarize one batch and persist results. Items missing from the
    /// response fall back to a caption prefix.
    async fn summarize_batch(&self, batch: &[ContentItem]) -> Result<()> {
        let prompt = prompts::summary_batch_prompt(batch);
        let response = self
            .model
            .complete(vec![ChatTurn::user(prompt)], SUMMARY_MAX_TOKENS)
            .await?;

        let text = strip_code_fence(response.trim());
        let entries: Vec<SummaryEntry> = serde_json::from_str(text)
            .map_err(|e| creatorlens_core::Error::Parse(format!("Summary JSON: {}", e)))?;
        let summary_map: std::collections::HashMap<i64, String> =
            entries.into_iter().map(|e| (e.id, e.summary)).collect();

        for item in batch {
            let summary = match summary_map.get(&item.id) {
                Some(s) => s.clone(),
                None => item
                    .caption
                    .as_deref()
                    .map(|c| truncate_chars(c, FALLBACK_SUMMARY_CHARS).to_string())
                    .unwrap_or_else(|| "No summary".to_string()),
            };
            self.store.set_item_summary(item.id, &summary)?;
        }
        Ok(())
    }

    /// When a whole batch fails, fall back to caption/title prefixes so
    /// the catalog still has a line per item.
    fn apply_fallback_summaries(&self, batch: &[ContentItem]) {
        for item in batch {
            if item.summary.is_some() {
                continue;
            }
            let fallback = item
                .caption
                .as_deref()
                .or(item.title.as_deref())
                .filter(|s| !s.is_empty())
                .map(|s| truncate_chars(s, FALLBACK_SUMMARY_CHARS).to_string())
                .unwrap_or_else(|| "No summary".to_string());
            if let Err(e) = self.store.set_item_summary(item.id, &fallback) {
                warn!("Fallback summary for item {} failed: {}", item.id, e);
            }
        }
    }

    /// Post-scrape hook: summarize newly inserted items without running
    /// the full pipeline.
    pub async fn summarize_new_items(&self, creator_id: i64) -> Result<usize> {
        let unsummarized = self.store.unsummarized_items_for_creator(creator_id)?;
        if unsummarized.is_empty() {
            return Ok(0);
        }

        let batch_size = self.limits.summary_batch_size;
        let total_batches = unsummarized.len().div_ceil(batch_size);

        for (batch_idx, batch) in unsummarized.chunks(batch_size).enumerate() {
            if let Err(e) = self.summarize_batch(batch).await {
                warn!("Summary batch {} failed: {}", batch_idx, e);
                self.apply_fallback_summaries(batch);
            }
            if batch_idx + 1 < total_batches {
                tokio::time::sleep(Duration::from_secs_f64(self.limits.rate_limit_delay_secs))
                    .await;
            }
        }
        Ok(unsummarized.len())
    }
}

/// Strip a markdown code fence wrapper if present.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the fence line (possibly "```json"), then the trailing fence
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or(rest);
    body.rsplit_once("```").map(|(b, _)| b).unwrap_or(body).trim()
}
