use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use toogether_graph::matching;
use toogether_graph::models::{Decision, SwipeOutcome, SwipeTarget};
use toogether_shared::errors::AppResult;
use toogether_shared::types::api::ApiResponse;
use toogether_shared::types::auth::AuthUser;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    pub target: SwipeTarget,
    pub decision: Decision,
}

pub async fn swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let outcome = matching::swipe(state.store.as_ref(), user.id, req.target, req.decision)?;
    Ok(Json(ApiResponse::ok(outcome)))
}
