//! Creator and platform management routes.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use creatorlens_core::{Error, PlatformKind};
use creatorlens_store::{ContentQuery, ContentSort, SortOrder};
use serde::Deserialize;
use tracing::info;

use super::error_response;
use crate::state::AppState;

const CONTENT_LIMIT_DEFAULT: usize = 500;
const CONTENT_LIMIT_MAX: usize = 10_000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/creators", post(create_creator).get(list_creators))
        .route(
            "/creators/{id}",
            get(get_creator).put(update_creator).delete(delete_creator),
        )
        .route("/creators/{id}/platforms", post(add_platform))
        .route(
            "/creators/{id}/platforms/{platform_id}",
            delete(remove_platform),
        )
        .route("/creators/{id}/content", get(list_content))
        .route("/compare", get(compare_creators))
}

#[derive(Deserialize)]
struct NewPlatform {
    kind: PlatformKind,
    handle: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct NewCreator {
    name: String,
    #[serde(default)]
    platforms: Vec<NewPlatform>,
}

async fn create_creator(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewCreator>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return error_response(&Error::Validation("Creator name is required".into()))
            .into_response();
    }

    let creator = match state.store.create_creator(name) {
        Ok(c) => c,
        Err(e) => return error_response(&e).into_response(),
    };

    let mut platforms = Vec::with_capacity(req.platforms.len());
    for p in &req.platforms {
        match state
            .store
            .add_platform(creator.id, p.kind, p.handle.trim(), p.url.as_deref())
        {
            Ok(platform) => platforms.push(platform),
            Err(e) => return error_response(&e).into_response(),
        }
    }

    info!("Created creator {} ({})", creator.id, creator.name);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "creator": creator, "platforms": platforms })),
    )
        .into_response()
}

async fn list_creators(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.list_creators() {
        Ok(creators) => Json(creators).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn get_creator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let creator = match state.store.get_creator(id) {
        Ok(Some(c)) => c,
        Ok(None) => {
            return error_response(&Error::NotFound(format!("Creator {} not found", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    };

    let platforms = match state.store.platforms_for_creator(id) {
        Ok(p) => p,
        Err(e) => return error_response(&e).into_response(),
    };
    let stats = match state.store.creator_stats(id) {
        Ok(s) => s,
        Err(e) => return error_response(&e).into_response(),
    };

    Json(serde_json::json!({
        "creator": creator,
        "platforms": platforms,
        "stats": stats,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct UpdateCreator {
    name: String,
}

async fn update_creator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCreator>,
) -> impl IntoResponse {
    let name = req.name.trim();
    if name.is_empty() {
        return error_response(&Error::Validation("Creator name is required".into()))
            .into_response();
    }
    match state.store.rename_creator(id, name) {
        Ok(true) => {}
        Ok(false) => {
            return error_response(&Error::NotFound(format!("Creator {} not found", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    get_creator(State(state), Path(id)).await.into_response()
}

async fn delete_creator(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.delete_creator(id) {
        Ok(true) => {}
        Ok(false) => {
            return error_response(&Error::NotFound(format!("Creator {} not found", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    if let Err(e) = state.vectors.delete_collection(id) {
        // Row is gone; a stale collection file is only wasted disk
        tracing::warn!("Failed to delete vector collection for {}: {}", id, e);
    }
    info!("Deleted creator {}", id);
    Json(serde_json::json!({ "deleted": true })).into_response()
}

async fn add_platform(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<NewPlatform>,
) -> impl IntoResponse {
    match state.store.get_creator(id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(&Error::NotFound(format!("Creator {} not found", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    if req.handle.trim().is_empty() {
        return error_response(&Error::Validation("Platform handle is required".into()))
            .into_response();
    }

    match state
        .store
        .add_platform(id, req.kind, req.handle.trim(), req.url.as_deref())
    {
        Ok(platform) => (StatusCode::CREATED, Json(platform)).into_response(),
        Err(e) => error_response(&e).into_response(),
    }
}

async fn remove_platform(
    State(state): State<Arc<AppState>>,
    Path((id, platform_id)): Path<(i64, i64)>,
) -> impl IntoResponse {
    // The platform must belong to the creator in the path
    match state.store.get_platform(platform_id) {
        Ok(Some(p)) if p.creator_id == id => {}
        Ok(_) => {
            return error_response(&Error::NotFound(format!(
                "Platform {} not found",
                platform_id
            )))
            .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }
    match state.store.delete_platform(platform_id) {
        Ok(_) => {
            info!("Deleted platform {} from creator {}", platform_id, id);
            Json(serde_json::json!({ "deleted": true })).into_response()
        }
        Err(e) => error_response(&e).into_response(),
    }
}

// ---------------------------------------------------------------
// Content listing
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct ContentParams {
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    sort_order: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
}

async fn list_content(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ContentParams>,
) -> impl IntoResponse {
    match state.store.get_creator(id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(&Error::NotFound(format!("Creator {} not found", id)))
                .into_response()
        }
        Err(e) => return error_response(&e).into_response(),
    }

    let platform = match params.platform.as_deref() {
        Some(raw) => match PlatformKind::parse(raw) {
            Some(kind) => Some(kind),
            None => {
                return error_response(&Error::Validation(format!(
                    "Unknown platform: {}",
                    raw
                )))
                .into_response()
            }
        },
        None => None,
    };
    let sort = match params.sort_by.as_deref() {
        Some(raw) => match ContentSort::parse(raw) {
            Some(sort) => sort,
            None => {
                return error_response(&Error::Validation(format!(
                    "Unknown sort column: {}",
                    raw
                )))
                .into_response()
            }
        },
        None => ContentSort::Timestamp,
    };
    let order = match params.sort_order.as_deref() {
        Some(raw) => match SortOrder::parse(raw) {
            Some(order) => order,
            None => {
                return error_response(&Error::Validation(format!(
                    "Sort order must be 'asc' or 'desc', got: {}",
                    raw
                )))
                .into_response()
            }
        },
        None => SortOrder::Desc,
    };
    let query = ContentQuery {
        platform,
        sort,
        order,
        limit: params
            .limit
            .unwrap_or(CONTENT_LIMIT_DEFAULT)
            .clamp(1, CONTENT_LIMIT_MAX),
        offset: params.offset.unwrap_or(0),
    };

    let items = match state.store.list_items_for_creator(id, &query) {
        Ok(items) => items,
        Err(e) => return error_response(&e).into_response(),
    };
    let platforms = match state.store.platforms_for_creator(id) {
        Ok(p) => p,
        Err(e) => return error_response(&e).into_response(),
    };
    let by_id: std::collections::HashMap<i64, _> =
        platforms.iter().map(|p| (p.id, p)).collect();

    // Items carry their platform kind and handle so the client doesn't
    // need a second lookup.
    let enriched: Vec<serde_json::Value> = items
        .iter()
        .filter_map(|item| {
            let mut value = serde_json::to_value(item).ok()?;
            if let (Some(obj), Some(p)) = (value.as_object_mut(), by_id.get(&item.platform_id)) {
                obj.insert("platformKind".into(), serde_json::json!(p.kind));
                obj.insert("platformHandle".into(), serde_json::json!(p.handle));
            }
            Some(value)
        })
        .collect();

    Json(enriched).into_response()
}

// ---------------------------------------------------------------
// Cross-creator comparison
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct CompareParams {
    /// Comma-separated creator ids.
    creator_ids: String,
}

async fn compare_creators(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompareParams>,
) -> impl IntoResponse {
    let ids: Vec<i64> = params
        .creator_ids
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if ids.len() < 2 {
        return error_response(&Error::Validation(
            "Need at least 2 creator ids to compare".into(),
        ))
        .into_response();
    }

    let mut results = Vec::with_capacity(ids.len());
    for cid in ids {
        // Unknown ids are skipped, not an error
        let creator = match state.store.get_creator(cid) {
            Ok(Some(c)) => c,
            Ok(None) => continue,
            Err(e) => return error_response(&e).into_response(),
        };
        let platforms = match state.store.platforms_for_creator(cid) {
            Ok(p) => p,
            Err(e) => return error_response(&e).into_response(),
        };
        let stats = match state.store.creator_stats(cid) {
            Ok(s) => s,
            Err(e) => return error_response(&e).into_response(),
        };

        results.push(serde_json::json!({
            "creatorId": cid,
            "name": creator.name,
            "platforms": platforms
                .iter()
                .map(|p| serde_json::json!({ "kind": p.kind, "handle": p.handle }))
                .collect::<Vec<_>>(),
            "totalContent": stats.total_items,
            "totalViews": stats.total_views,
            "avgViews": stats.avg_views,
            "avgLikes": stats.avg_likes,
            "avgComments": stats.avg_comments,
            "summary": creator.summary,
        }));
    }

    Json(results).into_response()
}
