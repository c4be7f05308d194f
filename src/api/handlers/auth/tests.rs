//! Scenario tests for the session/token core, driven through the router
//! with the in-memory store.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header::CONTENT_TYPE},
};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use super::memory::MemoryStore;
use super::rate_limit::FixedWindowRateLimiter;
use super::state::{AuthConfig, AuthState};
use super::store::{
    AuthStore, Credentials, DeviceRecord, DeviceStore, NewUser, RevocationStore, StoreError, User,
    UserStore,
};
use super::token::TokenCodec;

const SECRET: &str = "scenario-test-secret";
const PASSWORD: &str = "CorrectHorseBatteryStaple";

fn password_hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .expect("hash password")
        .to_string()
}

async fn seed_user(store: &MemoryStore, email: &str, is_admin: bool) -> User {
    store
        .insert_user(NewUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            password_hash: password_hash(PASSWORD),
            is_admin,
        })
        .await
        .expect("insert user")
}

fn state_with(store: Arc<dyn AuthStore>, config: AuthConfig) -> Arc<AuthState> {
    let rate_limiter = Arc::new(FixedWindowRateLimiter::new(
        config.general_window(),
        config.login_window(),
    ));
    Arc::new(AuthState::new(
        config,
        &SecretString::from(SECRET),
        store,
        rate_limiter,
    ))
}

fn app(state: Arc<AuthState>) -> Router {
    crate::api::router(state).expect("build router")
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("send request")
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse body")
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .expect("build request")
}

fn bearer_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .expect("build request")
}

async fn login_token(app: &Router, email: &str) -> String {
    let response = send(app, login_request(email, PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["token"]
        .as_str()
        .expect("token in login response")
        .to_string()
}

#[tokio::test]
async fn login_issues_token_that_authenticates() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store, AuthConfig::default()));

    let response = send(&app, login_request("alice@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["email"], json!("alice@example.com"));
    assert!(body["user"].get("password").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().expect("token").to_string();
    let response = send(&app, bearer_get("/v1/auth/session", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], json!(user.id.to_string()));
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store, AuthConfig::default()));

    let response = send(&app, login_request("alice@example.com", "wrong")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = body_json(response).await;

    let response = send(&app, login_request("nobody@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = body_json(response).await;

    // Indistinguishable responses; no account probing through login.
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn blocked_account_cannot_login() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "alice@example.com", false).await;
    store
        .set_blocked(user.id, true)
        .await
        .expect("set blocked");
    let app = app(state_with(store, AuthConfig::default()));

    let response = send(&app, login_request("alice@example.com", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn logout_revokes_token_and_fresh_login_succeeds() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store, AuthConfig::default()));

    let first_token = login_token(&app, "alice@example.com").await;

    let logout = Request::builder()
        .method("POST")
        .uri("/v1/auth/logout")
        .header("authorization", format!("Bearer {first_token}"))
        .body(Body::empty())
        .expect("build request");
    let response = send(&app, logout).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The revoked token is refused everywhere from now on.
    let response = send(&app, bearer_get("/v1/auth/session", &first_token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Token revoked"));

    // A fresh login issues a different token that works.
    let second_token = login_token(&app, "alice@example.com").await;
    assert_ne!(first_token, second_token);
    let response = send(&app, bearer_get("/v1/auth/session", &second_token)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_refused_with_distinct_message() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store, AuthConfig::default()));

    let stale_codec = TokenCodec::new(&SecretString::from(SECRET), -2);
    let token = stale_codec.issue(user.id).expect("issue token");

    let response = send(&app, bearer_get("/v1/auth/session", &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Token expired"));
}

#[tokio::test]
async fn blocking_invalidates_all_outstanding_tokens() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store.clone(), AuthConfig::default()));

    let token = login_token(&app, "alice@example.com").await;
    let response = send(&app, bearer_get("/v1/auth/session", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    store
        .set_blocked(user.id, true)
        .await
        .expect("set blocked");

    // The token was never revoked, yet it dies with the account.
    let response = send(&app, bearer_get("/v1/auth/session", &token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Account is blocked"));
}

#[tokio::test]
async fn admin_routes_require_the_fresh_role() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store.clone(), AuthConfig::default()));

    let token = login_token(&app, "alice@example.com").await;

    // Valid token, but not an admin.
    let response = send(&app, bearer_get("/v1/admin/users", &token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Admin access required"));

    // Promote the user; the very same token now passes, since the role is
    // read from the user record at authentication, not from the token.
    store
        .set_admin(user.id, true)
        .await
        .expect("set admin");
    let response = send(&app, bearer_get("/v1/admin/users", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["users"][0]["email"], json!("alice@example.com"));
}

#[tokio::test]
async fn admin_can_block_and_promote_over_http() {
    let store = Arc::new(MemoryStore::new());
    let _admin = seed_user(&store, "admin@example.com", true).await;
    let victim = seed_user(&store, "victim@example.com", false).await;
    let app = app(state_with(store, AuthConfig::default()));

    let admin_token = login_token(&app, "admin@example.com").await;
    let victim_token = login_token(&app, "victim@example.com").await;

    let block = Request::builder()
        .method("PUT")
        .uri(format!("/v1/admin/users/{}/block", victim.id))
        .header("authorization", format!("Bearer {admin_token}"))
        .body(Body::empty())
        .expect("build request");
    let response = send(&app, block).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, bearer_get("/v1/auth/session", &victim_token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Promote a brand-new admin through the role endpoint.
    let unblock = Request::builder()
        .method("PUT")
        .uri(format!("/v1/admin/users/{}/unblock", victim.id))
        .header("authorization", format!("Bearer {admin_token}"))
        .body(Body::empty())
        .expect("build request");
    let response = send(&app, unblock).await;
    assert_eq!(response.status(), StatusCode::OK);

    let promote = Request::builder()
        .method("PUT")
        .uri(format!("/v1/admin/users/{}/role", victim.id))
        .header("authorization", format!("Bearer {admin_token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "is_admin": true }).to_string()))
        .expect("build request");
    let response = send(&app, promote).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, bearer_get("/v1/admin/users", &victim_token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Unknown ids are a 404, not an error.
    let missing = Request::builder()
        .method("PUT")
        .uri(format!("/v1/admin/users/{}/block", Uuid::new_v4()))
        .header("authorization", format!("Bearer {admin_token}"))
        .body(Body::empty())
        .expect("build request");
    let response = send(&app, missing).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sixth_login_attempt_from_one_ip_is_limited() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(
        store,
        AuthConfig::default().with_login_window(3600, 5),
    ));

    for _ in 0..5 {
        let mut request = login_request("alice@example.com", "wrong");
        request
            .headers_mut()
            .insert("x-forwarded-for", "1.2.3.4".parse().expect("header"));
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let mut request = login_request("alice@example.com", PASSWORD);
    request
        .headers_mut()
        .insert("x-forwarded-for", "1.2.3.4".parse().expect("header"));
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("LOGIN_LIMIT_EXCEEDED"));

    // A different IP still has a fresh window.
    let mut request = login_request("alice@example.com", PASSWORD);
    request
        .headers_mut()
        .insert("x-forwarded-for", "5.6.7.8".parse().expect("header"));
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn general_traffic_is_limited_per_ip() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(
        store,
        AuthConfig::default().with_general_window(900, 3),
    ));

    for _ in 0..3 {
        let response = send(
            &app,
            Request::builder()
                .method("GET")
                .uri("/v1/auth/session")
                .body(Body::empty())
                .expect("build request"),
        )
        .await;
        // Unauthenticated, but allowed through the limiter.
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/v1/auth/session")
            .body(Body::empty())
            .expect("build request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("RATE_LIMIT_EXCEEDED"));

    // Routes outside the API surface are not throttled.
    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .expect("build request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_records_the_device_and_logout_does_not() {
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "alice@example.com", false).await;
    let app = app(state_with(store, AuthConfig::default()));

    let mut request = login_request("alice@example.com", PASSWORD);
    request
        .headers_mut()
        .insert("user-agent", "shop-app/2.1".parse().expect("header"));
    request
        .headers_mut()
        .insert("x-forwarded-for", "1.2.3.4".parse().expect("header"));
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["token"]
        .as_str()
        .expect("token")
        .to_string();

    let logout = Request::builder()
        .method("POST")
        .uri("/v1/auth/logout")
        .header("authorization", format!("Bearer {token}"))
        .header("user-agent", "logout-agent/1.0")
        .body(Body::empty())
        .expect("build request");
    let response = send(&app, logout).await;
    assert_eq!(response.status(), StatusCode::OK);

    let second_token = login_token(&app, "alice@example.com").await;
    let mut request = bearer_get("/v1/auth/devices", &second_token);
    request
        .headers_mut()
        .insert("user-agent", "shop-app/2.1".parse().expect("header"));
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let devices = body["devices"].as_array().expect("devices array");

    assert!(devices.iter().any(|device| {
        device["user_agent"] == json!("shop-app/2.1") && device["ip_address"] == json!("1.2.3.4")
    }));
    // Logout never leaves a sighting behind.
    assert!(
        devices
            .iter()
            .all(|device| device["user_agent"] != json!("logout-agent/1.0"))
    );
}

/// Store that fails every operation; used to prove that infrastructure
/// trouble surfaces as 503 and never as an auth decision.
struct FailingStore;

fn store_down() -> StoreError {
    StoreError(anyhow::anyhow!("store down"))
}

#[async_trait]
impl UserStore for FailingStore {
    async fn load_user(&self, _id: Uuid) -> Result<Option<User>, StoreError> {
        Err(store_down())
    }

    async fn lookup_credentials(&self, _email: &str) -> Result<Option<Credentials>, StoreError> {
        Err(store_down())
    }

    async fn insert_user(&self, _user: NewUser) -> Result<User, StoreError> {
        Err(store_down())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Err(store_down())
    }

    async fn set_blocked(&self, _id: Uuid, _blocked: bool) -> Result<Option<User>, StoreError> {
        Err(store_down())
    }

    async fn set_admin(&self, _id: Uuid, _is_admin: bool) -> Result<Option<User>, StoreError> {
        Err(store_down())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(store_down())
    }
}

#[async_trait]
impl RevocationStore for FailingStore {
    async fn revoke(
        &self,
        _user_id: Uuid,
        _token: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(store_down())
    }

    async fn is_revoked(&self, _user_id: Uuid, _token: &str) -> Result<bool, StoreError> {
        Err(store_down())
    }
}

#[async_trait]
impl DeviceStore for FailingStore {
    async fn upsert_device(
        &self,
        _user_id: Uuid,
        _user_agent: &str,
        _ip_address: &str,
        _seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(store_down())
    }

    async fn list_devices(&self, _user_id: Uuid) -> Result<Vec<DeviceRecord>, StoreError> {
        Err(store_down())
    }
}

#[tokio::test]
async fn store_outage_is_503_not_an_auth_decision() {
    let state = state_with(Arc::new(FailingStore), AuthConfig::default());
    let app = app(state.clone());

    let token = state
        .gate()
        .codec()
        .issue(Uuid::new_v4())
        .expect("issue token");
    let response = send(&app, bearer_get("/v1/auth/session", &token)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));

    // Health reports the same outage.
    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .expect("build request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn stateless_checks_run_before_the_store() {
    let state = state_with(Arc::new(FailingStore), AuthConfig::default());
    let app = app(state);

    // An expired token must be reported as expired even though the store is
    // down: signature and expiry never touch it.
    let stale_codec = TokenCodec::new(&SecretString::from(SECRET), -2);
    let token = stale_codec.issue(Uuid::new_v4()).expect("issue token");
    let response = send(&app, bearer_get("/v1/auth/session", &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Token expired"));

    let response = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/v1/auth/session")
            .body(Body::empty())
            .expect("build request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Authentication required"));
}
