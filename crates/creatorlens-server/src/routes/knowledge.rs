//! Knowledge artifact routes and the generation progress stream.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use creatorlens_core::{truncate_chars, Error};
use creatorlens_knowledge::KnowledgePipeline;
use creatorlens_store::KnowledgeKind;
use futures::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;

use super::error_response;
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

const PREVIEW_CHARS: usize = 200;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/creators/{id}/knowledge", get(knowledge_status))
        .route("/creators/{id}/knowledge/generate", post(generate))
        .route("/creators/{id}/knowledge/{kind}", get(get_artifact))
}

async fn knowledge_status(
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

    let stats = match state.store.creator_stats(id) {
        Ok(s) => s,
        Err(e) => return error_response(&e).into_response(),
    };
    let summarized = match state.store.count_summarized_for_creator(id) {
        Ok(c) => c,
        Err(e) => return error_response(&e).into_response(),
    };
    let entries = match state.store.knowledge_for_creator(id) {
        Ok(entries) => entries,
        Err(e) => return error_response(&e).into_response(),
    };

    let previews: Vec<serde_json::Value> = entries
        .iter()
        .map(|k| {
            serde_json::json!({
                "kind": k.kind,
                "generatedAt": k.generated_at,
                "version": k.version,
                "preview": truncate_chars(&k.content, PREVIEW_CHARS),
            })
        })
        .collect();

    Json(serde_json::json!({
        "totalItems": stats.total_items,
        "summarizedItems": summarized,
        "entries": previews,
    }))
    .into_response()
}

async fn get_artifact(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(i64, String)>,
) -> impl IntoResponse {
    let Some(kind) = KnowledgeKind::parse(&kind) else {
        return error_response(&Error::Validation(format!(
            "Unknown knowledge kind: {}",
            kind
        )))
        .into_response();
    };

    match state.store.get_knowledge(id, kind) {
        Ok(Some(artifact)) => Json(artifact).into_response(),
        Ok(None) => error_response(&Error::NotFound(format!(
            "No {} knowledge for creator {}",
            kind, id
        )))
        .into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Sse<SseStream>, (StatusCode, Json<serde_json::Value>)> {
    match state.store.get_creator(id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err(error_response(&Error::NotFound(format!(
                "Creator {} not found",
                id
            ))))
        }
        Err(e) => return Err(error_response(&e)),
    }

    let model = state
        .chat_model()
        .ok_or_else(|| error_response(&Error::Config("No LLM provider configured".into())))?;

    if !state.begin_generation(id) {
        return Err((
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "Knowledge generation already running for this creator",
            })),
        ));
    }

    info!("Starting knowledge generation for creator {}", id);

    let rx = state.progress.subscribe(id);
    let store = Arc::clone(&state.store);
    let limits = state.config.limits.clone();
    let state_for_task = Arc::clone(&state);

    tokio::spawn(async move {
        let pipeline = KnowledgePipeline::new(store, model, limits);
        let events = pipeline.generate_all(id);
        futures::pin_mut!(events);
        // The pipeline keeps running even if every subscriber disconnects
        // so the artifacts still land.
        while let Some(event) = events.next().await {
            state_for_task.progress.broadcast(id, &event);
        }
        state_for_task.progress.remove(id);
        state_for_task.end_generation(id);
    });

    let stream: SseStream = Box::pin(UnboundedReceiverStream::new(rx).map(|event| {
        Ok(Event::default()
            .data(serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string())))
    }));

    Ok(Sse::new(stream))
}
