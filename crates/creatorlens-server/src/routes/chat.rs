//! Chat routes: sessions, SSE message streaming, file uploads, LLM
//! configuration.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use creatorlens_chat::FileAttachment;
use creatorlens_core::Error;
use creatorlens_llm::{LlmConfigUpdate, StreamChunk};
use futures::Stream;
use serde::Deserialize;
use tokio_stream::StreamExt;
use tracing::warn;

use super::error_response;
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;
type SseResult = Result<Sse<SseStream>, (StatusCode, Json<serde_json::Value>)>;

const MAX_FILES_PER_MESSAGE: usize = 3;
const MAX_FILE_BYTES: usize = 500_000;
const ALLOWED_FILE_EXTENSIONS: [&str; 4] = ["txt", "md", "csv", "json"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/creators/{id}/chat", post(create_session))
        .route("/creators/{id}/chat/sessions", get(list_sessions))
        .route("/chat/{session_id}", delete(delete_session))
        .route("/chat/{session_id}/messages", get(list_messages).post(send_message))
        .route("/chat/{session_id}/messages/upload", post(send_message_with_files))
        .route("/chat/config", get(get_config).put(update_config))
}

// ---------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------

async fn create_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.engine.create_session(id) {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_creator(id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(&Error::NotFound(format!("Creator {} not found", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    match state.store.sessions_for_creator(id) {
        Ok(sessions) => Json(sessions).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_chat_session(session_id) {
        Ok(true) => Json(serde_json::json!({ "deleted": true })).into_response(),
        Ok(false) => error_response(&Error::NotFound(format!(
            "Chat session {} not found",
            session_id
        )))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_chat_session(session_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(&Error::NotFound(format!(
                "Chat session {} not found",
                session_id
            )))
            .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    match state.store.messages_for_session(session_id) {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

// ---------------------------------------------------------------
// Streaming reply (SSE)
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct SendMessage {
    message: String,
}

fn sse_data<T: serde::Serialize>(payload: &T) -> Event {
    Event::default().data(serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string()))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
    Json(req): Json<SendMessage>,
) -> SseResult {
    reply_stream(&state, session_id, req.message, Vec::new()).await
}

/// Multipart variant of `send_message`: a `content` text field plus up to
/// three small text files passed to the model with this turn. Attachments
/// are never persisted.
async fn send_message_with_files(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<i64>,
    mut multipart: Multipart,
) -> SseResult {
    let mut content = String::new();
    let mut attachments: Vec<FileAttachment> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(&Error::Validation(format!("Invalid form data: {}", e))))?
    {
        match field.name() {
            Some("content") => {
                content = field.text().await.map_err(|e| {
                    error_response(&Error::Validation(format!("Invalid form data: {}", e)))
                })?;
            }
            Some("files") => {
                let filename = field.file_name().unwrap_or("").to_string();
                if filename.is_empty() {
                    continue;
                }
                if attachments.len() >= MAX_FILES_PER_MESSAGE {
                    return Err(error_response(&Error::Validation(format!(
                        "Too many files (max {})",
                        MAX_FILES_PER_MESSAGE
                    ))));
                }
                let ext = std::path::Path::new(&filename)
                    .extension()
                    .map(|e| e.to_string_lossy().to_lowercase())
                    .unwrap_or_default();
                if !ALLOWED_FILE_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(error_response(&Error::Validation(format!(
                        "File type '.{}' not allowed. Allowed: .txt, .md, .csv, .json",
                        ext
                    ))));
                }
                let bytes = field.bytes().await.map_err(|e| {
                    error_response(&Error::Validation(format!("Invalid form data: {}", e)))
                })?;
                if bytes.len() > MAX_FILE_BYTES {
                    return Err(error_response(&Error::Validation(format!(
                        "File '{}' exceeds max size ({}KB)",
                        filename,
                        MAX_FILE_BYTES / 1000
                    ))));
                }
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    error_response(&Error::Validation(format!(
                        "File '{}' is not valid UTF-8 text",
                        filename
                    )))
                })?;
                attachments.push(FileAttachment {
                    filename,
                    content: text,
                });
            }
            _ => {}
        }
    }

    reply_stream(&state, session_id, content, attachments).await
}

async fn reply_stream(
    state: &Arc<AppState>,
    session_id: i64,
    message: String,
    attachments: Vec<FileAttachment>,
) -> SseResult {
    if message.trim().is_empty() {
        return Err(error_response(&Error::Validation("Message is required".into())));
    }

    let model = state
        .chat_model()
        .ok_or_else(|| error_response(&Error::Config("No LLM provider configured".into())))?;
    let label = model.label();

    let start = Instant::now();
    let mut chunks = state
        .engine
        .stream_reply(session_id, message, attachments, model)
        .await
        .map_err(|e| error_response(&e))?;

    let stream: SseStream = Box::pin(async_stream::stream! {
        while let Some(chunk) = chunks.next().await {
            match chunk {
                StreamChunk::Token(content) => {
                    yield Ok(sse_data(&serde_json::json!({
                        "type": "text",
                        "content": content,
                    })));
                }
                StreamChunk::Done { tokens_used } => {
                    yield Ok(sse_data(&serde_json::json!({
                        "type": "done",
                        "model": label,
                        "tokensUsed": tokens_used,
                        "duration": start.elapsed().as_millis() as u64,
                    })));
                }
                StreamChunk::Error(error) => {
                    warn!("Chat stream error: {}", error);
                    yield Ok(sse_data(&serde_json::json!({
                        "type": "error",
                        "error": error,
                    })));
                }
            }
        }
    });

    Ok(Sse::new(stream))
}

// ---------------------------------------------------------------
// LLM configuration
// ---------------------------------------------------------------

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.llm_config.read().to_response())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LlmConfigUpdate>,
) -> impl IntoResponse {
    let mut config = state.llm_config.write();
    config.apply_update(&update);
    if let Err(e) = config.save() {
        return error_response(&Error::Storage(e.to_string())).into_response();
    }
    Json(config.to_response()).into_response()
}
