//! Conversation engine: retrieval, prompt assembly, streaming, persistence.

use std::collections::HashMap;
use std::sync::Arc;

use creatorlens_core::{truncate_chars, Error, Limits, Result};
use creatorlens_llm::{BoxedStream, ChatModel, ChatTurn, StreamChunk};
use creatorlens_retrieve::{build_content_catalog, build_context, keyword_search};
use creatorlens_store::{ChatSession, ContentItem, KnowledgeKind, Platform, SqliteStore};
use creatorlens_vector::VectorStore;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::prompt::{build_model_messages, build_system_prompt, FileAttachment, PromptInputs};

const REPLY_MAX_TOKENS: usize = 4_096;
const TITLE_CHARS: usize = 80;
const DEFAULT_SESSION_TITLE: &str = "New Chat";
const KEYWORD_RESULTS: usize = 5;
const SEMANTIC_RESULTS: usize = 5;

/// Hybrid-retrieval chat over a creator's content library.
pub struct ChatEngine {
    store: Arc<SqliteStore>,
    vectors: Arc<VectorStore>,
    limits: Limits,
}

fn label_map(platforms: &[Platform]) -> HashMap<i64, String> {
    platforms.iter().map(|p| (p.id, p.label())).collect()
}

impl ChatEngine {
    pub fn new(store: Arc<SqliteStore>, vectors: Arc<VectorStore>, limits: Limits) -> Self {
        Self {
            store,
            vectors,
            limits,
        }
    }

    /// Open a new chat session for a creator.
    pub fn create_session(&self, creator_id: i64) -> Result<ChatSession> {
        self.store
            .get_creator(creator_id)?
            .ok_or_else(|| Error::NotFound(format!("Creator {} not found", creator_id)))?;
        self.store.create_chat_session(creator_id, DEFAULT_SESSION_TITLE)
    }

    /// Retrieve the question-specific transcript context: keyword hits
    /// first, then semantic hits that add new items. Semantic search
    /// failures degrade to keyword-only retrieval.
    pub async fn retrieve_context(&self, creator_id: i64, question: &str) -> Result<String> {
        let platforms = self.store.platforms_for_creator(creator_id)?;
        if platforms.is_empty() {
            return Ok("No content data available yet.".to_string());
        }
        let labels = label_map(&platforms);
        let items = self.store.items_for_creator(creator_id)?;

        let label_for = |item: &ContentItem| {
            labels
                .get(&item.platform_id)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string())
        };

        let keyword_hits: Vec<(ContentItem, String)> =
            keyword_search(question, &items, &self.limits, KEYWORD_RESULTS)
                .into_iter()
                .map(|scored| {
                    let label = label_for(&scored.item);
                    (scored.item, label)
                })
                .collect();

        let query = truncate_chars(question, self.limits.max_keyword_extract_chars);
        let semantic_hits: Vec<(ContentItem, String)> =
            match self.vectors.search(creator_id, query, SEMANTIC_RESULTS).await {
                Ok(hits) => hits
                    .into_iter()
                    .filter_map(|hit| {
                        items
                            .iter()
                            .find(|i| i.id == hit.metadata.content_id)
                            .map(|item| (item.clone(), label_for(item)))
                    })
                    .collect(),
                Err(e) => {
                    debug!("Embedding search skipped: {}", e);
                    Vec::new()
                }
            };

        Ok(build_context(&keyword_hits, &semantic_hits, &self.limits))
    }

    fn assemble_system_prompt(
        &self,
        creator_id: i64,
        context: &str,
        attachments: &[FileAttachment],
    ) -> Result<String> {
        let creator = self
            .store
            .get_creator(creator_id)?
            .ok_or_else(|| Error::NotFound(format!("Creator {} not found", creator_id)))?;
        let platforms = self.store.platforms_for_creator(creator_id)?;
        let mut platform_counts = Vec::with_capacity(platforms.len());
        for p in platforms {
            let count = self.store.count_items_for_platform(p.id)?;
            platform_counts.push((p, count));
        }
        let stats = self.store.creator_stats(creator_id)?;

        let knowledge: HashMap<KnowledgeKind, String> = self
            .store
            .knowledge_for_creator(creator_id)?
            .into_iter()
            .map(|k| (k.kind, k.content))
            .collect();

        let labels: HashMap<i64, String> = platform_counts
            .iter()
            .map(|(p, _)| (p.id, p.label()))
            .collect();
        let catalog_items: Vec<(ContentItem, String)> = self
            .store
            .items_for_creator(creator_id)?
            .into_iter()
            .map(|item| {
                let label = labels
                    .get(&item.platform_id)
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                (item, label)
            })
            .collect();
        let catalog = build_content_catalog(&catalog_items, &self.limits);

        Ok(build_system_prompt(
            &PromptInputs {
                creator: &creator,
                platforms: &platform_counts,
                stats: &stats,
                knowledge: &knowledge,
                catalog: &catalog,
                context,
                attachments,
            },
            &self.limits,
        ))
    }

    /// Handle one user message: persist it, retrieve context, stream the
    /// model's reply, then persist the assistant turn and auto-title the
    /// session on its first exchange.
    ///
    /// The model is driven on a detached task, so a client that drops the
    /// returned stream mid-reply cannot cancel persistence of the
    /// assistant turn.
    pub async fn stream_reply(
        &self,
        session_id: i64,
        user_message: String,
        attachments: Vec<FileAttachment>,
        model: Arc<dyn ChatModel>,
    ) -> Result<BoxedStream> {
        let session = self
            .store
            .get_chat_session(session_id)?
            .ok_or_else(|| Error::NotFound(format!("Chat session {} not found", session_id)))?;

        // History is captured before the user turn is saved so the new
        // message isn't duplicated in the provider payload.
        let history = self
            .store
            .recent_history(session_id, self.limits.chat_history_limit)?;
        let first_exchange = history.is_empty();

        // The stored copy keeps the full text even when the provider
        // payload is truncated.
        self.store.add_chat_message(session_id, "user", &user_message)?;

        let query = truncate_chars(&user_message, self.limits.max_keyword_extract_chars);
        let context = self.retrieve_context(session.creator_id, query).await?;
        let system_prompt =
            self.assemble_system_prompt(session.creator_id, &context, &attachments)?;

        let mut messages = vec![ChatTurn::system(system_prompt)];
        messages.extend(build_model_messages(&history, &user_message, &self.limits));

        let store = Arc::clone(&self.store);
        let title = truncate_chars(&user_message, TITLE_CHARS).to_string();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            use futures::StreamExt;

            let mut inner = model.stream(messages, REPLY_MAX_TOKENS);
            let mut full_response = String::new();
            let mut failed: Option<String> = None;

            while let Some(chunk) = inner.next().await {
                match &chunk {
                    StreamChunk::Token(text) => full_response.push_str(text),
                    StreamChunk::Error(msg) => failed = Some(msg.clone()),
                    StreamChunk::Done { .. } => {}
                }
                let is_terminal = matches!(
                    &chunk,
                    StreamChunk::Done { .. } | StreamChunk::Error(_)
                );
                // A send failure means the client went away; keep draining
                // so the turn still lands in the store.
                let _ = tx.send(chunk);
                if is_terminal {
                    break;
                }
            }

            // Keep whatever streamed before a failure alongside the error
            if let Some(msg) = failed {
                if full_response.is_empty() {
                    full_response = msg;
                } else {
                    full_response = format!("{}\n\n{}", full_response, msg);
                }
            }

            if let Err(e) = store.add_chat_message(session_id, "assistant", &full_response) {
                warn!("Failed to persist assistant message: {}", e);
            }

            if first_exchange {
                if let Err(e) = store.set_session_title(session_id, &title) {
                    warn!("Failed to auto-title session {}: {}", session_id, e);
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use creatorlens_core::{NewContentItem, PlatformKind};
    use creatorlens_vector::NoopEmbedder;
    use tempfile::TempDir;
    use tokio_stream::StreamExt;

    /// Streams scripted chunks and records the messages it was given.
    struct ScriptedModel {
        tokens: Vec<String>,
        error: Option<String>,
        seen: std::sync::Mutex<Vec<ChatTurn>>,
    }

    impl ScriptedModel {
        fn new(tokens: &[&str], error: Option<&str>) -> Self {
            Self {
                tokens: tokens.iter().map(|t| t.to_string()).collect(),
                error: error.map(|e| e.to_string()),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _messages: Vec<ChatTurn>, _max_tokens: usize) -> Result<String> {
            Ok(self.tokens.join(""))
        }

        fn stream(&self, messages: Vec<ChatTurn>, _max_tokens: usize) -> BoxedStream {
            *self.seen.lock().unwrap() = messages;
            let tokens = self.tokens.clone();
            let error = self.error.clone();
            Box::pin(async_stream::stream! {
                let count = tokens.len();
                for t in tokens {
                    yield StreamChunk::Token(t);
                }
                match error {
                    Some(e) => yield StreamChunk::Error(e),
                    None => yield StreamChunk::Done { tokens_used: count },
                }
            })
        }

        fn label(&self) -> String {
            "scripted/test".to_string()
        }
    }

    fn engine() -> (ChatEngine, Arc<SqliteStore>, i64, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("db")).unwrap());
        let vectors = Arc::new(
            VectorStore::new(dir.path().join("vectors"), Arc::new(NoopEmbedder::new(16)))
                .unwrap(),
        );
        let creator = store.create_creator("Alex").unwrap();
        let platform = store
            .add_platform(creator.id, PlatformKind::YouTube, "alex", None)
            .unwrap();
        store
            .insert_content_item(
                platform.id,
                &NewContentItem {
                    external_id: "v1".to_string(),
                    url: None,
                    title: Some("Pasta basics".to_string()),
                    caption: Some("How to cook pasta".to_string()),
                    transcript: Some("Today we cook pasta from scratch".to_string()),
                    transcript_source: None,
                    timestamp: None,
                    likes: 5,
                    comments: 1,
                    views: 100,
                    duration: 60.0,
                },
            )
            .unwrap();
        let engine = ChatEngine::new(store.clone(), vectors, Limits::default());
        (engine, store, creator.id, dir)
    }

    async fn drain(stream: BoxedStream) -> (String, bool) {
        let mut text = String::new();
        let mut errored = false;
        let mut stream = stream;
        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::Token(t) => text.push_str(&t),
                StreamChunk::Error(_) => errored = true,
                StreamChunk::Done { .. } => {}
            }
        }
        (text, errored)
    }

    #[tokio::test]
    async fn test_reply_persists_both_turns_and_titles_session() {
        let (engine, store, creator_id, _dir) = engine();
        let session = engine.create_session(creator_id).unwrap();
        assert_eq!(session.title, "New Chat");

        let model = Arc::new(ScriptedModel::new(&["Hello ", "there"], None));
        let stream = engine
            .stream_reply(
                session.id,
                "What pasta videos exist?".to_string(),
                Vec::new(),
                model,
            )
            .await
            .unwrap();
        let (text, errored) = drain(stream).await;
        assert_eq!(text, "Hello there");
        assert!(!errored);

        let messages = store.messages_for_session(session.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[0].content, "What pasta videos exist?");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "Hello there");

        let session = store.get_chat_session(session.id).unwrap().unwrap();
        assert_eq!(session.title, "What pasta videos exist?");
    }

    #[tokio::test]
    async fn test_title_not_overwritten_on_second_exchange() {
        let (engine, store, creator_id, _dir) = engine();
        let session = engine.create_session(creator_id).unwrap();

        for msg in ["first question", "second question"] {
            let model = Arc::new(ScriptedModel::new(&["ok"], None));
            let stream = engine
                .stream_reply(session.id, msg.to_string(), Vec::new(), model)
                .await
                .unwrap();
            drain(stream).await;
        }

        let session = store.get_chat_session(session.id).unwrap().unwrap();
        assert_eq!(session.title, "first question");
    }

    #[tokio::test]
    async fn test_provider_error_persists_partial_and_error() {
        let (engine, store, creator_id, _dir) = engine();
        let session = engine.create_session(creator_id).unwrap();

        let model = Arc::new(ScriptedModel::new(
            &["partial"],
            Some("API error 529: overloaded"),
        ));
        let stream = engine
            .stream_reply(session.id, "question".to_string(), Vec::new(), model)
            .await
            .unwrap();
        let (text, errored) = drain(stream).await;
        assert_eq!(text, "partial");
        assert!(errored);

        let messages = store.messages_for_session(session.id).unwrap();
        let assistant = &messages[1];
        assert!(assistant.content.contains("partial"));
        assert!(assistant.content.contains("API error 529"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (engine, _store, _creator_id, _dir) = engine();
        let model = Arc::new(ScriptedModel::new(&[], None));
        let result = engine
            .stream_reply(999, "hi".to_string(), Vec::new(), model)
            .await;
        assert!(matches!(result.err(), Some(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_attachments_included_in_system_prompt() {
        let (engine, store, creator_id, _dir) = engine();
        let session = engine.create_session(creator_id).unwrap();

        let model = Arc::new(ScriptedModel::new(&["ok"], None));
        let attachments = vec![FileAttachment {
            filename: "notes.md".to_string(),
            content: "brand guidelines".to_string(),
        }];
        let stream = engine
            .stream_reply(
                session.id,
                "what do my notes say?".to_string(),
                attachments,
                model.clone() as Arc<dyn ChatModel>,
            )
            .await
            .unwrap();
        drain(stream).await;

        let seen = model.seen.lock().unwrap();
        let system = &seen[0];
        assert_eq!(system.role, "system");
        assert!(system.content.contains("## User-Provided Reference Material"));
        assert!(system.content.contains("### notes.md"));
        assert!(system.content.contains("brand guidelines"));

        // Attachment text is not persisted with either turn
        let messages = store.messages_for_session(session.id).unwrap();
        assert!(messages.iter().all(|m| !m.content.contains("brand guidelines")));
    }

    #[tokio::test]
    async fn test_reply_persists_after_client_disconnect() {
        let (engine, store, creator_id, _dir) = engine();
        let session = engine.create_session(creator_id).unwrap();

        let model = Arc::new(ScriptedModel::new(&["first ", "second"], None));
        let mut stream = engine
            .stream_reply(session.id, "tell me about pasta".to_string(), Vec::new(), model)
            .await
            .unwrap();
        let chunk = stream.next().await.unwrap();
        assert!(matches!(chunk, StreamChunk::Token(_)));
        // Client walks away mid-reply.
        drop(stream);

        let mut messages = Vec::new();
        for _ in 0..100 {
            messages = store.messages_for_session(session.id).unwrap();
            if messages.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "first second");

        let session = store.get_chat_session(session.id).unwrap().unwrap();
        assert_eq!(session.title, "tell me about pasta");
    }

    #[tokio::test]
    async fn test_create_session_requires_creator() {
        let (engine, _store, _creator_id, _dir) = engine();
        assert!(matches!(
            engine.create_session(404),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_context_keyword_match() {
        let (engine, _store, creator_id, _dir) = engine();
        let context = engine
            .retrieve_context(creator_id, "pasta cooking tips")
            .await
            .unwrap();
        assert!(context.contains("### Keyword-Matched Transcripts"));
        assert!(context.contains("Pasta basics"));
    }

    #[tokio::test]
    async fn test_retrieve_context_no_platforms() {
        let (engine, store, _creator_id, _dir) = engine();
        let lonely = store.create_creator("NoPlatforms").unwrap();
        let context = engine.retrieve_context(lonely.id, "anything").await.unwrap();
        assert_eq!(context, "No content data available yet.");
    }
}
