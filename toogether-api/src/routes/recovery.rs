//! Password recovery: request a code by mail, trade it for an access token,
//! then use that token to set a new password.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use toogether_graph::profiles::{self, normalize_email};
use toogether_graph::recovery;
use toogether_shared::errors::{AppError, AppResult};
use toogether_shared::types::api::ApiResponse;
use toogether_shared::types::auth::{AccessGrant, AuthUser};

use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CodeRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
}

pub async fn request_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CodeRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    recovery::request_code(state.store.as_ref(), &state.email, state.clock.as_ref(), &req.email).await?;
    Ok(Json(ApiResponse::ok("verification code sent")))
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub email: String,
    pub code: String,
}

pub async fn validate_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValidateRequest>,
) -> AppResult<Json<ApiResponse<AccessGrant>>> {
    let grant = recovery::validate_code(
        state.store.as_ref(),
        &state.tokens,
        state.clock.as_ref(),
        &req.email,
        &req.code,
    )?;
    Ok(Json(ApiResponse::ok(grant)))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Requires the token handed out by `validate_code`, issued to the owner of
/// `email`.
pub async fn reset_password(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    let caller = profiles::require(state.store.as_ref(), user.id)?;
    if caller.email != normalize_email(&req.email) {
        tracing::warn!(profile_id = %user.id, "password reset for another account rejected");
        return Err(AppError::forbidden("token does not belong to this account"));
    }

    recovery::reset_password(
        state.store.as_ref(),
        state.hasher.as_ref(),
        &req.email,
        &req.password,
        &req.confirm_password,
    )?;
    Ok(Json(ApiResponse::ok("password updated")))
}
