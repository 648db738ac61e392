//! Keyword extraction and frequency-scored transcript search.

use std::collections::HashMap;

use creatorlens_core::{truncate_chars, Limits};
use creatorlens_store::ContentItem;

/// Raw-token fallback size when every token is a stop word.
const FALLBACK_TOKEN_COUNT: usize = 5;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could",
    "should", "may", "might", "can", "shall", "to", "of", "in", "for",
    "on", "with", "at", "by", "from", "as", "into", "about", "between",
    "through", "after", "before", "during", "without", "this", "that",
    "these", "those", "it", "its", "he", "she", "they", "them", "his",
    "her", "their", "my", "your", "our", "what", "which", "who", "whom",
    "how", "when", "where", "why", "not", "no", "nor", "but", "or",
    "and", "if", "then", "so", "than", "too", "very", "just", "more",
    "most", "some", "any", "all", "each", "every", "both", "few", "many",
    "much", "such", "own", "other", "i", "me", "we", "you", "up", "out",
    "get", "got", "like", "also", "tell", "think", "know", "say", "said",
    "make", "go", "going", "want", "really", "right",
];

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}

/// Alphabetic tokens of at least 3 chars from the lowercased text.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Extract search keywords from a question.
///
/// Only the first `max_keyword_extract_chars` of the question feed the
/// tokenizer. Stop words are dropped; if that leaves nothing, the first
/// few raw tokens are used instead. Keywords are ranked by frequency and
/// capped at `max_keywords`.
pub fn extract_keywords(question: &str, limits: &Limits) -> Vec<String> {
    let extract_text = truncate_chars(question, limits.max_keyword_extract_chars).to_lowercase();
    let words = tokenize(&extract_text);
    let mut keywords: Vec<String> = words
        .iter()
        .filter(|w| !is_stop_word(w))
        .cloned()
        .collect();

    if keywords.is_empty() {
        keywords = words.into_iter().take(FALLBACK_TOKEN_COUNT).collect();
    }
    if keywords.is_empty() {
        return Vec::new();
    }

    // Rank by frequency, first-seen order breaking ties
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for kw in &keywords {
        let entry = counts.entry(kw.as_str()).or_insert(0);
        if *entry == 0 {
            order.push(kw.as_str());
        }
        *entry += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> = order
        .iter()
        .enumerate()
        .map(|(i, kw)| (*kw, counts[kw], i))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limits.max_keywords)
        .map(|(kw, _, _)| kw.to_string())
        .collect()
}

/// A content item with its keyword-match score.
pub struct ScoredItem {
    pub item: ContentItem,
    pub score: i64,
}

fn count_occurrences(haystack: &str, needle: &str) -> i64 {
    if needle.is_empty() {
        return 0;
    }
    haystack.match_indices(needle).count() as i64
}

/// Score items by total keyword occurrences in transcript + caption +
/// title, and return the top `max_results` matches (score > 0) in
/// descending score order.
pub fn keyword_search(
    question: &str,
    items: &[ContentItem],
    limits: &Limits,
    max_results: usize,
) -> Vec<ScoredItem> {
    let keywords = extract_keywords(question, limits);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredItem> = items
        .iter()
        .filter_map(|item| {
            let searchable = format!(
                "{} {} {}",
                item.transcript.as_deref().unwrap_or("").to_lowercase(),
                item.caption.as_deref().unwrap_or("").to_lowercase(),
                item.title.as_deref().unwrap_or("").to_lowercase(),
            );
            let score: i64 = keywords
                .iter()
                .map(|kw| count_occurrences(&searchable, kw))
                .sum();
            (score > 0).then(|| ScoredItem {
                item: item.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(max_results);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    fn item(id: i64, transcript: &str) -> ContentItem {
        ContentItem {
            id,
            platform_id: 1,
            external_id: format!("ext{}", id),
            url: None,
            title: None,
            caption: None,
            transcript: Some(transcript.to_string()),
            transcript_source: None,
            timestamp: None,
            likes: 0,
            comments: 0,
            views: 0,
            duration: 0.0,
            is_embedded: false,
            summary: None,
        }
    }

    #[test]
    fn test_extract_drops_stop_words() {
        let keywords = extract_keywords("what are the best editing tricks", &limits());
        assert_eq!(keywords, vec!["best", "editing", "tricks"]);
    }

    #[test]
    fn test_extract_frequency_order() {
        let keywords = extract_keywords("pasta sauce pasta dough pasta", &limits());
        assert_eq!(keywords[0], "pasta");
    }

    #[test]
    fn test_extract_fallback_to_raw_tokens() {
        // Every token is a stop word; fall back to the raw token list
        let keywords = extract_keywords("what are these", &limits());
        assert_eq!(keywords, vec!["what", "are", "these"]);
    }

    #[test]
    fn test_extract_short_tokens_ignored() {
        let keywords = extract_keywords("ai ml editing", &limits());
        assert_eq!(keywords, vec!["editing"]);
    }

    #[test]
    fn test_search_ranks_by_occurrences() {
        let items = vec![
            item(1, "editing editing editing is fun"),
            item(2, "editing once"),
            item(3, "nothing relevant here"),
        ];
        let hits = keyword_search("tips for editing", &items, &limits(), 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].item.id, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_search_caps_results() {
        let items: Vec<ContentItem> =
            (1..=10).map(|i| item(i, "cooking at home")).collect();
        let hits = keyword_search("cooking", &items, &limits(), 5);
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_search_empty_question() {
        let items = vec![item(1, "anything")];
        assert!(keyword_search("", &items, &limits(), 5).is_empty());
    }
}
