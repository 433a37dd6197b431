pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use toogether_graph::matching::QueueOptions;
use toogether_graph::ports::{Argon2Hasher, Clock, PasswordHasher};
use toogether_graph::GraphStore;
use toogether_shared::clients::email::EmailClient;
use toogether_shared::types::auth::TokenSecret;

use crate::config::AppConfig;
use crate::services::token_service::JwtIssuer;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn GraphStore>,
    pub email: EmailClient,
    pub tokens: JwtIssuer,
    pub hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
    pub metrics_handle: PrometheusHandle,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn GraphStore>,
        email: EmailClient,
        clock: Arc<dyn Clock>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let tokens = JwtIssuer::new(config.jwt_secret.clone(), config.jwt_access_ttl);
        Self {
            config,
            store,
            email,
            tokens,
            hasher: Arc::new(Argon2Hasher),
            clock,
            metrics_handle,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    pub fn queue_options(&self) -> QueueOptions {
        QueueOptions {
            max_distance_km: self.config.max_distance_km,
            today: self.today(),
        }
    }
}

impl TokenSecret for AppState {
    fn token_secret(&self) -> &str {
        &self.config.jwt_secret
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    use crate::routes::{auth, blocks, groups, health, matches, profile, queue, recovery, swipes};

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route(
            "/me",
            get(profile::get_profile)
                .patch(profile::update_profile)
                .delete(profile::delete_profile),
        )
        .route("/me/onboarding", post(profile::complete_onboarding))
        .route("/me/location", post(profile::update_location))
        .route("/me/counters", get(profile::counters))
        .route("/queue", get(queue::get_queue))
        .route("/swipes", post(swipes::swipe))
        .route("/matches", get(matches::list_matches))
        .route("/blocks", get(blocks::list_blocked))
        .route("/blocks/:id", post(blocks::block).delete(blocks::unblock))
        .route("/groups", post(groups::create_group))
        .route(
            "/groups/:id/members/:member_id",
            post(groups::add_member).delete(groups::remove_member),
        )
        .route("/recovery/code", post(recovery::request_code))
        .route("/recovery/validate", post(recovery::validate_code))
        .route("/recovery/reset", post(recovery::reset_password))
        .layer(axum::middleware::from_fn(toogether_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
