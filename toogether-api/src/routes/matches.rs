use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use toogether_graph::matching;
use toogether_graph::models::MatchDetail;
use toogether_shared::errors::AppResult;
use toogether_shared::types::api::{ApiResponse, Counted};
use toogether_shared::types::auth::AuthUser;

use crate::AppState;

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Counted<MatchDetail>>>> {
    let matches = matching::list_matches(state.store.as_ref(), user.id, state.today())?;
    Ok(Json(ApiResponse::ok(matches.into())))
}
