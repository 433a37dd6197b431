use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use toogether_api::config::AppConfig;
use toogether_api::{router, AppState};
use toogether_graph::models::VerificationCode;
use toogether_graph::ports::{PasswordHasher, SystemClock};
use toogether_graph::{GraphStore, MemoryStore};
use toogether_shared::clients::email::EmailClient;
use toogether_shared::errors::AppResult;

struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain:") == Some(password))
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

fn test_app() -> TestApp {
    // Nothing listens on port 9, so every mail delivery fails.
    let email = EmailClient::new("test-key", "noreply@toogether.app", "Toogether")
        .with_endpoint("http://127.0.0.1:9/emails");
    let mut state = AppState::new(
        AppConfig::default(),
        Arc::new(MemoryStore::new()),
        email,
        Arc::new(SystemClock),
        PrometheusBuilder::new().build_recorder().handle(),
    );
    state.hasher = Arc::new(PlainHasher);
    let state = Arc::new(state);
    TestApp { router: router(state.clone()), state }
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Signs up and returns (profile id, access token).
    async fn signup(&self, email: &str) -> (Uuid, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/signup",
                None,
                Some(json!({ "email": email, "password": "Passw0rd!", "repeated_password": "Passw0rd!" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["profile_id"].as_str().unwrap().parse().unwrap();
        let token = body["data"]["access_token"].as_str().unwrap().to_string();
        (id, token)
    }

    async fn onboarded(&self, email: &str, gender: &str, show_me: &str) -> (Uuid, String) {
        let (id, token) = self.signup(email).await;
        let (status, body) = self
            .call(
                Method::POST,
                "/me/onboarding",
                Some(&token),
                Some(json!({
                    "name": email.split('@').next().unwrap(),
                    "birthdate": "2000-05-01",
                    "gender": gender,
                    "show_me": show_me,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (id, token)
    }

    async fn like(&self, token: &str, kind: &str, id: Uuid) -> (StatusCode, Value) {
        self.call(
            Method::POST,
            "/swipes",
            Some(token),
            Some(json!({ "target": { "kind": kind, "id": id }, "decision": "like" })),
        )
        .await
    }
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn health_includes_store_check() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"][0]["name"], "store");
}

#[tokio::test]
async fn metrics_are_exposed_as_text() {
    let app = test_app();
    let (status, _) = app.call(Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_validates_and_rejects_duplicates() {
    let app = test_app();
    let (status, body) = app
        .call(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "not-an-email", "password": "Passw0rd!", "repeated_password": "Passw0rd!" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "E0002");

    app.signup("ana@example.com").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/signup",
            None,
            Some(json!({ "email": "ANA@example.com", "password": "Passw0rd!", "repeated_password": "Passw0rd!" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "E1002");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = test_app();
    let (status, body) = app.call(Method::GET, "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "E0004");

    let (status, _) = app.call(Method::GET, "/queue", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn onboarding_fills_profile_and_rejects_minors() {
    let app = test_app();
    let (_, token) = app.signup("ana@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/me/onboarding",
            Some(&token),
            Some(json!({ "name": "Ana", "birthdate": "2020-01-01", "gender": "F", "show_me": "M" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "E2004");

    let (status, body) = app.call(Method::GET, "/queue", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "E2003");

    let (_, token) = app.onboarded("leo@example.com", "male", "women").await;
    let (status, body) = app.call(Method::GET, "/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["has_account"], true);
    assert_eq!(body["data"]["gender"], "Male");
    assert_eq!(body["data"]["total_matches"], 0);
    assert!(body["data"]["age"].as_i64().unwrap() >= 25);
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn location_out_of_range_is_rejected() {
    let app = test_app();
    let (_, token) = app.signup("ana@example.com").await;
    let (status, body) = app
        .call(Method::POST, "/me/location", Some(&token), Some(json!({ "lat": 95.0, "lon": 0.0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "E0002");

    let (status, body) = app
        .call(Method::POST, "/me/location", Some(&token), Some(json!({ "lat": 4.6, "lon": -74.08 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["location"]["latitude"], 4.6);
}

#[tokio::test]
async fn mutual_likes_create_a_single_match() {
    let app = test_app();
    let (ana, ana_token) = app.onboarded("ana@example.com", "F", "M").await;
    let (leo, leo_token) = app.onboarded("leo@example.com", "M", "W").await;

    let (_, body) = app.call(Method::GET, "/queue", Some(&ana_token), None).await;
    let queue = body["data"].as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["kind"], "profile");
    assert_eq!(queue[0]["id"], leo.to_string());

    let (status, body) = app.like(&ana_token, "profile", leo).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["matched"], false);

    let (_, body) = app.like(&leo_token, "profile", ana).await;
    assert_eq!(body["data"]["matched"], true);
    let match_id = body["data"]["match"]["id"].clone();

    let (_, body) = app.like(&leo_token, "profile", ana).await;
    assert_eq!(body["data"]["match"]["id"], match_id);

    let (_, body) = app.call(Method::GET, "/matches", Some(&ana_token), None).await;
    assert_eq!(body["data"]["count"], 1);

    let (_, body) = app.call(Method::GET, "/me/counters", Some(&ana_token), None).await;
    assert_eq!(body["data"], json!({ "pending_likes": 0, "total_matches": 1 }));

    let (_, body) = app.call(Method::GET, "/queue", Some(&ana_token), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn blocks_hide_profiles_and_forbid_swipes() {
    let app = test_app();
    let (ana, ana_token) = app.onboarded("ana@example.com", "F", "E").await;
    let (leo, leo_token) = app.onboarded("leo@example.com", "M", "E").await;

    let (status, _) = app.call(Method::POST, &format!("/blocks/{leo}"), Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::POST, &format!("/blocks/{leo}"), Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call(Method::GET, "/queue", Some(&leo_token), None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = app.like(&leo_token, "profile", ana).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "E3001");

    let (_, body) = app.call(Method::GET, "/blocks", Some(&ana_token), None).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["results"][0]["id"], leo.to_string());

    let (status, _) = app.call(Method::DELETE, &format!("/blocks/{leo}"), Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.call(Method::GET, "/queue", Some(&leo_token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.call(Method::POST, &format!("/blocks/{ana}"), Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "E0006");
}

#[tokio::test]
async fn groups_are_owner_managed_and_queued_after_profiles() {
    let app = test_app();
    let (_, ana_token) = app.onboarded("ana@example.com", "F", "M").await;
    let (mia, mia_token) = app.onboarded("mia@example.com", "F", "M").await;
    let (_, leo_token) = app.onboarded("leo@example.com", "M", "W").await;

    let (status, body) = app
        .call(Method::POST, "/groups", Some(&ana_token), Some(json!({ "gender": "F" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::POST, &format!("/groups/{group_id}/members/{mia}"), Some(&ana_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_members"], 2);

    let (status, body) = app
        .call(Method::DELETE, &format!("/groups/{group_id}/members/{mia}"), Some(&mia_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "E2005");

    let (_, body) = app.call(Method::GET, "/queue", Some(&leo_token), None).await;
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["profile", "profile", "group"]);

    let (_, body) = app.call(Method::GET, "/queue?limit=1", Some(&leo_token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recovery_flow_resets_password() {
    let app = test_app();
    let (ana, _) = app.signup("ana@example.com").await;
    let (_, leo_token) = app.signup("leo@example.com").await;

    let (status, body) = app
        .call(Method::POST, "/recovery/code", None, Some(json!({ "email": "nobody@example.com" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "E1003");

    let (status, body) = app
        .call(Method::POST, "/recovery/code", None, Some(json!({ "email": "ana@example.com" })))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_code(&body), "E1010");
    assert!(app.state.store.verification_code("ana@example.com").unwrap().is_none());

    app.state
        .store
        .upsert_code(&VerificationCode {
            email: "ana@example.com".into(),
            code: "ABC123".into(),
            expires_at: Utc::now() + Duration::minutes(5),
        })
        .unwrap();

    let (status, body) = app
        .call(Method::POST, "/recovery/validate", None, Some(json!({ "email": "ana@example.com", "code": "ZZZ999" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "E1009");

    let (status, body) = app
        .call(Method::POST, "/recovery/validate", None, Some(json!({ "email": "ana@example.com", "code": "abc123" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["profile_id"], ana.to_string());
    let reset_token = body["data"]["access_token"].as_str().unwrap().to_string();

    let reset = json!({ "email": "ana@example.com", "password": "N3wPassword", "confirm_password": "N3wPassword" });
    let (status, _) = app.call(Method::POST, "/recovery/reset", Some(&leo_token), Some(reset.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mismatch = json!({ "email": "ana@example.com", "password": "N3wPassword", "confirm_password": "other" });
    let (status, body) = app.call(Method::POST, "/recovery/reset", Some(&reset_token), Some(mismatch)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "E1007");

    let (status, _) = app.call(Method::POST, "/recovery/reset", Some(&reset_token), Some(reset)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::POST, "/login", None, Some(json!({ "email": "ana@example.com", "password": "Passw0rd!" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .call(Method::POST, "/login", None, Some(json!({ "email": "ana@example.com", "password": "N3wPassword" })))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_profile_removes_its_matches() {
    let app = test_app();
    let (ana, ana_token) = app.onboarded("ana@example.com", "F", "E").await;
    let (leo, leo_token) = app.onboarded("leo@example.com", "M", "E").await;
    app.like(&ana_token, "profile", leo).await;
    app.like(&leo_token, "profile", ana).await;

    let (status, _) = app.call(Method::DELETE, "/me", Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call(Method::GET, "/matches", Some(&leo_token), None).await;
    assert_eq!(body["data"]["count"], 0);
    let (status, body) = app.call(Method::GET, "/me", Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "E2001");
}
