use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use toogether_graph::matching::build_queue;
use toogether_graph::models::SwipeUnit;
use toogether_shared::errors::AppResult;
use toogether_shared::types::api::ApiResponse;
use toogether_shared::types::auth::AuthUser;

use crate::AppState;

const DEFAULT_PAGE: usize = 20;
const MAX_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub limit: Option<usize>,
}

/// GET /queue - the next swipe units for the caller, profiles first
pub async fn get_queue(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<QueueQuery>,
) -> AppResult<Json<ApiResponse<Vec<SwipeUnit>>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    let units: Vec<SwipeUnit> = build_queue(state.store.as_ref(), user.id, state.queue_options())?
        .take(limit)
        .collect();

    tracing::debug!(profile_id = %user.id, returned = units.len(), "queue served");
    Ok(Json(ApiResponse::ok(units)))
}
