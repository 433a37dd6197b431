use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use toogether_graph::ports::TokenIssuer;
use toogether_graph::profiles;
use toogether_shared::errors::{AppError, AppResult};
use toogether_shared::types::api::ApiResponse;
use toogether_shared::types::auth::AccessGrant;

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
    pub repeated_password: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AccessGrant>>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = profiles::register(
        state.store.as_ref(),
        state.hasher.as_ref(),
        &req.email,
        &req.password,
        &req.repeated_password,
    )?;
    let grant = state.tokens.issue(profile.id)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(grant))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AccessGrant>>> {
    let grant = profiles::login(
        state.store.as_ref(),
        state.hasher.as_ref(),
        &state.tokens,
        &req.email,
        &req.password,
    )?;
    Ok(Json(ApiResponse::ok(grant)))
}
