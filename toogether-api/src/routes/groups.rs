use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use toogether_graph::groups;
use toogether_graph::models::{Gender, GroupCard};
use toogether_shared::errors::AppResult;
use toogether_shared::types::api::ApiResponse;
use toogether_shared::types::auth::AuthUser;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub gender: Gender,
}

pub async fn create_group(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGroupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<GroupCard>>)> {
    let store = state.store.as_ref();
    let group = groups::create_group(store, user.id, req.gender)?;
    let card = groups::group_card(store, group.id, state.today())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(card))))
}

pub async fn add_member(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((group_id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<GroupCard>>> {
    let store = state.store.as_ref();
    groups::add_member(store, user.id, group_id, member_id)?;
    Ok(Json(ApiResponse::ok(groups::group_card(store, group_id, state.today())?)))
}

pub async fn remove_member(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((group_id, member_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<GroupCard>>> {
    let store = state.store.as_ref();
    groups::remove_member(store, user.id, group_id, member_id)?;
    Ok(Json(ApiResponse::ok(groups::group_card(store, group_id, state.today())?)))
}
