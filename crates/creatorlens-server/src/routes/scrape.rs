//! Scrape routes: background job trigger, job history, progress stream.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use creatorlens_core::{ContentSource, Error};
use creatorlens_knowledge::{KnowledgePipeline, ProgressEvent, Stage};
use creatorlens_store::{ContentItem, Platform};
use creatorlens_vector::{build_document_text, DocumentedItem};
use futures::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::error_response;
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

const JOB_HISTORY_LIMIT: usize = 20;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/creators/{id}/scrape", post(trigger_scrape))
        .route("/creators/{id}/scrape/jobs", get(list_jobs))
        .route("/scrape/{job_id}/progress", get(job_progress))
}

fn source_for(state: &AppState, kind: creatorlens_core::PlatformKind) -> Option<Arc<dyn ContentSource>> {
    state.sources.iter().find(|s| s.platform() == kind).cloned()
}

/// Start a scrape in the background and return the job record right away.
/// Progress streams from `/scrape/{job_id}/progress` while it runs.
async fn trigger_scrape(
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

    let platforms = match state.store.platforms_for_creator(id) {
        Ok(p) => p,
        Err(e) => return error_response(&e).into_response(),
    };
    if platforms.is_empty() {
        return error_response(&Error::Validation("No platforms linked".into())).into_response();
    }

    if !state.begin_scrape(id) {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "Scrape already in progress" })),
        )
            .into_response();
    }

    let job = match state.store.create_scrape_job(id) {
        Ok(j) => j,
        Err(e) => {
            state.end_scrape(id);
            return error_response(&e).into_response();
        }
    };

    info!("Starting scrape job {} for creator {}", job.id, id);

    let job_id = job.id;
    let task_state = Arc::clone(&state);
    tokio::spawn(async move {
        let (found, error) = run_scrape(&task_state, job_id, id, &platforms).await;
        if let Err(e) = task_state
            .store
            .finish_scrape_job(job_id, found, error.as_deref())
        {
            warn!("Failed to finish scrape job {}: {}", job_id, e);
        }
        let summary = match &error {
            Some(msg) => ProgressEvent::error(format!("Scrape failed: {}", msg)),
            None => ProgressEvent::stage(
                Stage::Done,
                format!("Scrape completed. {} new items.", found),
            ),
        };
        task_state.scrape_progress.broadcast(job_id, &summary);
        task_state.scrape_progress.remove(job_id);
        task_state.end_scrape(id);
    });

    Json(job).into_response()
}

/// The scrape itself: fetch per platform, dedup-insert, embed, summarize.
/// Returns the new-item count and the first fetch error, if any.
async fn run_scrape(
    state: &Arc<AppState>,
    job_id: i64,
    creator_id: i64,
    platforms: &[Platform],
) -> (i64, Option<String>) {
    let mut new_items: Vec<(ContentItem, String)> = Vec::new();
    let mut scrape_error: Option<String> = None;

    for platform in platforms {
        let Some(source) = source_for(state, platform.kind) else {
            warn!("No scraper registered for {}", platform.kind.as_str());
            continue;
        };

        state.scrape_progress.broadcast(
            job_id,
            &ProgressEvent::stage(
                Stage::Platform,
                format!("Scraping {}: {}", platform.kind, platform.handle),
            ),
        );

        let fetched = match source.fetch_new_items(&platform.handle).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Scrape failed for {}: {}", platform.label(), e);
                scrape_error.get_or_insert(e.to_string());
                continue;
            }
        };

        for item in &fetched {
            match state.store.insert_content_item(platform.id, item) {
                Ok(Some(item_id)) => {
                    if let Ok(Some(stored)) = state.store.get_content_item(item_id) {
                        new_items.push((stored, platform.label()));
                    }
                }
                // None means this external id was already scraped
                Ok(None) => {}
                Err(e) => {
                    warn!("Insert failed for {}: {}", item.external_id, e);
                }
            }
        }

        if let Err(e) = state.store.mark_platform_scraped(platform.id) {
            warn!("Failed to mark platform {} scraped: {}", platform.id, e);
        }
    }

    // Embed what we can; a missing embedder key degrades to keyword-only
    // retrieval for these items.
    if !new_items.is_empty() && state.vectors.embedder_available() {
        let documented: Vec<DocumentedItem> = new_items
            .iter()
            .map(|(item, label)| DocumentedItem {
                item: item.clone(),
                document: build_document_text(item, label),
                platform_label: label.clone(),
            })
            .collect();
        match state.vectors.embed_content_items(creator_id, &documented).await {
            Ok(embedded_ids) => {
                if let Err(e) = state.store.mark_items_embedded(&embedded_ids) {
                    warn!("Failed to flag embedded items: {}", e);
                }
            }
            Err(e) => warn!("Embedding new items failed: {}", e),
        }
    }

    // Post-scrape summaries keep the catalog complete without a full
    // knowledge regeneration.
    if !new_items.is_empty() {
        if let Some(model) = state.chat_model() {
            state.scrape_progress.broadcast(
                job_id,
                &ProgressEvent::stage(Stage::Processing, "Generating summaries for new items"),
            );
            let pipeline = KnowledgePipeline::new(
                Arc::clone(&state.store),
                model,
                state.config.limits.clone(),
            );
            if let Err(e) = pipeline.summarize_new_items(creator_id).await {
                warn!("Post-scrape summarization failed: {}", e);
            }
        }
    }

    let found = new_items.len() as i64;
    info!(
        "Scrape job {} for creator {} found {} new items",
        job_id, creator_id, found
    );
    (found, scrape_error)
}

async fn list_jobs(
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
    match state.store.recent_scrape_jobs(id, JOB_HISTORY_LIMIT) {
        Ok(jobs) => Json(jobs).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

/// SSE stream of progress events for one scrape job. The stream ends
/// when the job finishes; a job that is already done yields its stored
/// terminal state and closes.
async fn job_progress(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<i64>,
) -> Result<Sse<SseStream>, (StatusCode, Json<serde_json::Value>)> {
    let job = match state.store.get_scrape_job(job_id) {
        Ok(Some(j)) => j,
        Ok(None) => {
            return Err(error_response(&Error::NotFound(format!(
                "Scrape job {} not found",
                job_id
            ))))
        }
        Err(e) => return Err(error_response(&e)),
    };

    if job.status != "running" {
        let event = match job.error_message {
            Some(msg) => ProgressEvent::error(format!("Scrape failed: {}", msg)),
            None => ProgressEvent::stage(
                Stage::Done,
                format!("Scrape completed. {} new items.", job.new_items_found),
            ),
        };
        let stream: SseStream = Box::pin(futures::stream::once(async move {
            Ok(sse_event(&event))
        }));
        return Ok(Sse::new(stream));
    }

    let rx = state.scrape_progress.subscribe(job_id);
    let stream: SseStream =
        Box::pin(UnboundedReceiverStream::new(rx).map(|event| Ok(sse_event(&event))));
    Ok(Sse::new(stream))
}

fn sse_event(event: &ProgressEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string()))
}
