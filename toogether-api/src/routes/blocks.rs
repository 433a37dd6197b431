use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use toogether_graph::blocks;
use toogether_graph::models::ProfileCard;
use toogether_shared::errors::AppResult;
use toogether_shared::types::api::{ApiResponse, Counted};
use toogether_shared::types::auth::AuthUser;

use crate::AppState;

/// GET /blocks
pub async fn list_blocked(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Counted<ProfileCard>>>> {
    let blocked = blocks::list_blocked(state.store.as_ref(), user.id, state.today())?;
    Ok(Json(ApiResponse::ok(blocked)))
}

/// POST /blocks/:id
pub async fn block(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    blocks::block(state.store.as_ref(), user.id, target_id)?;
    Ok(Json(ApiResponse::ok("blocked")))
}

/// DELETE /blocks/:id
pub async fn unblock(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    blocks::unblock(state.store.as_ref(), user.id, target_id)?;
    Ok(Json(ApiResponse::ok("unblocked")))
}
