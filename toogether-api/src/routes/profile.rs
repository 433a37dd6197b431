use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use toogether_graph::counters::{self, Counters};
use toogether_graph::models::{Profile, ProfileSetup, ProfileUpdate};
use toogether_graph::profiles::{self, ProfileOverview};
use toogether_shared::errors::{AppError, AppResult};
use toogether_shared::types::api::ApiResponse;
use toogether_shared::types::auth::AuthUser;

use crate::AppState;

// --- GET /me ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileOverview>>> {
    let overview = profiles::profile_overview(state.store.as_ref(), user.id, state.today())?;
    Ok(Json(ApiResponse::ok(overview)))
}

// --- PATCH /me ---

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProfileUpdate>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let updated = profiles::update_profile(state.store.as_ref(), user.id, payload)?;
    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /me ---

pub async fn delete_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<&'static str>>> {
    profiles::delete_profile(state.store.as_ref(), user.id)?;
    Ok(Json(ApiResponse::ok("profile deleted")))
}

// --- POST /me/onboarding ---

pub async fn complete_onboarding(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(setup): Json<ProfileSetup>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profiles::create_profile(state.store.as_ref(), user.id, setup, state.today())?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- POST /me/location ---

#[derive(Debug, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180"))]
    pub lon: f64,
}

pub async fn update_location(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LocationRequest>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = profiles::update_location(state.store.as_ref(), user.id, req.lat, req.lon)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- GET /me/counters ---

pub async fn counters(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Counters>>> {
    profiles::require(state.store.as_ref(), user.id)?;
    let counters = counters::counters(state.store.as_ref(), user.id)?;
    Ok(Json(ApiResponse::ok(counters)))
}
