//! System prompt and message-list assembly.
//!
//! The prompt layers three tiers: always-included pre-computed knowledge,
//! the complete one-line content catalog, and question-specific full
//! transcripts. Character budgets cap each layer, then a final backstop
//! caps the whole prompt.

use std::collections::HashMap;

use creatorlens_core::{format_thousands, truncate_chars, truncate_with_marker, Limits};
use creatorlens_store::{ChatMessage, Creator, CreatorStats, KnowledgeKind, Platform};
use creatorlens_llm::ChatTurn;

const CATALOG_TRUNCATED_MARKER: &str = "\n\n[...catalog truncated to fit token limits]";
const CONTEXT_TRUNCATED_MARKER: &str = "\n\n[...transcripts truncated to fit token limits]";
const PROMPT_TRUNCATED_MARKER: &str = "\n\n[System prompt truncated to fit token limits]";
const HISTORY_TRUNCATED_MARKER: &str = "\n[...truncated]";
const USER_MSG_TRUNCATED_MARKER: &str = "\n\n[Message truncated — full message was saved]";

/// A user-uploaded text file attached to a chat message. The content is
/// passed to the model verbatim; attachments are never persisted.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub filename: String,
    pub content: String,
}

/// Everything the system prompt is assembled from.
pub struct PromptInputs<'a> {
    pub creator: &'a Creator,
    /// Platforms paired with their item counts.
    pub platforms: &'a [(Platform, i64)],
    pub stats: &'a CreatorStats,
    /// Knowledge artifacts by kind.
    pub knowledge: &'a HashMap<KnowledgeKind, String>,
    /// Pre-built catalog block.
    pub catalog: &'a str,
    /// Pre-built retrieved-transcripts block.
    pub context: &'a str,
    /// Files the user attached to the current message.
    pub attachments: &'a [FileAttachment],
}

fn platform_display(platform: &Platform) -> &'static str {
    match platform.kind {
        creatorlens_core::PlatformKind::Instagram => "Instagram",
        creatorlens_core::PlatformKind::YouTube => "YouTube",
    }
}

/// Assemble the full system prompt.
pub fn build_system_prompt(inputs: &PromptInputs<'_>, limits: &Limits) -> String {
    let platforms_str = if inputs.platforms.is_empty() {
        "  No platforms linked".to_string()
    } else {
        inputs
            .platforms
            .iter()
            .map(|(p, count)| {
                format!("  - {}: @{} ({} items)", platform_display(p), p.handle, count)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    // Tier 1: pre-computed knowledge, always included when present
    let mut tier1_sections: Vec<String> = Vec::new();
    if let Some(profile) = inputs.knowledge.get(&KnowledgeKind::Profile) {
        tier1_sections.push(format!("## Creator Profile\n{}", profile));
    } else if let Some(summary) = &inputs.creator.summary {
        tier1_sections.push(format!("## Creator Summary\n{}", summary));
    }
    if let Some(topics) = inputs.knowledge.get(&KnowledgeKind::Topics) {
        tier1_sections.push(format!("## Topic Clusters\n{}", topics));
    }
    if let Some(style) = inputs.knowledge.get(&KnowledgeKind::Style) {
        tier1_sections.push(format!("## Style Analysis\n{}", style));
    }
    let tier1_str = tier1_sections.join("\n\n");

    let stats_str = format!(
        "Total content items: {} | Average views: {} | Average likes: {}",
        inputs.stats.total_items,
        format_thousands(inputs.stats.avg_views),
        format_thousands(inputs.stats.avg_likes),
    );

    // Budget guards before final assembly
    let catalog = truncate_with_marker(
        inputs.catalog,
        limits.max_catalog_chars,
        CATALOG_TRUNCATED_MARKER,
    );
    let context = truncate_with_marker(
        inputs.context,
        limits.max_context_chars,
        CONTEXT_TRUNCATED_MARKER,
    );

    let files_section = if inputs.attachments.is_empty() {
        String::new()
    } else {
        let file_parts: Vec<String> = inputs
            .attachments
            .iter()
            .map(|att| format!("### {}\n```\n{}\n```", att.filename, att.content))
            .collect();
        format!(
            "\n\n## User-Provided Reference Material\n\
             The user attached the following files with their message:\n\n{}",
            file_parts.join("\n\n")
        )
    };

    let prompt = format!(
        "You are an expert content analyst with deep knowledge of creator \"{name}\".\n\
         \n\
         ## Creator: {name}\n\
         Platforms:\n\
         {platforms}\n\
         Stats: {stats}\n\
         \n\
         {tier1}\n\
         \n\
         ## Complete Content Catalog\n\
         Every video/reel from this creator with summaries:\n\
         \n\
         {catalog}\n\
         \n\
         ## Relevant Full Transcripts\n\
         The following full transcripts were retrieved based on the user's current question:\n\
         \n\
         {context}{files}\n\
         \n\
         ## Instructions\n\
         - You have comprehensive knowledge about this creator from the profile, topic clusters, and style analysis above\n\
         - The content catalog lists EVERY video — use it to reference specific content, identify patterns, and provide complete answers\n\
         - Full transcripts below are the primary source for detailed quotes and specific content analysis\n\
         - Reference specific posts/videos when relevant (include URLs if available)\n\
         - Provide data-backed insights (engagement numbers, trends, patterns)\n\
         - Be specific and actionable in your recommendations\n\
         - If the transcripts don't contain enough detail for a specific question, note what you know from the catalog/profile and suggest which videos might have more info\n",
        name = inputs.creator.name,
        platforms = platforms_str,
        stats = stats_str,
        tier1 = tier1_str,
        catalog = catalog,
        context = context,
        files = files_section,
    );

    // Hard cap on total system prompt size
    truncate_with_marker(&prompt, limits.max_system_prompt_chars, PROMPT_TRUNCATED_MARKER)
}

/// Build the provider message list: capped history turns followed by the
/// (possibly truncated) current user message. The stored copy of the
/// user message is always full length.
pub fn build_model_messages(
    history: &[ChatMessage],
    user_message: &str,
    limits: &Limits,
) -> Vec<ChatTurn> {
    let mut messages: Vec<ChatTurn> = history
        .iter()
        .map(|msg| ChatTurn {
            role: msg.role.clone(),
            content: truncate_with_marker(
                &msg.content,
                limits.max_history_turn_chars,
                HISTORY_TRUNCATED_MARKER,
            ),
        })
        .collect();

    let user_content = if user_message.chars().count() > limits.max_user_msg_chars {
        format!(
            "{}{}",
            truncate_chars(user_message, limits.max_user_msg_chars),
            USER_MSG_TRUNCATED_MARKER
        )
    } else {
        user_message.to_string()
    };
    messages.push(ChatTurn::user(user_content));
    messages
}
