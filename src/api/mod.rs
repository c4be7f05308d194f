use crate::api::handlers::{auth, health, root};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post, put},
};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, info, info_span, warn};
use ulid::Ulid;
use url::Url;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Start the server.
///
/// With a DSN the Postgres store is used; without one the process runs on
/// the in-memory store, which is only suitable for development.
///
/// # Errors
///
/// Returns an error if the database connection, router construction, or
/// listener bind fails.
pub async fn new(
    port: u16,
    dsn: Option<String>,
    auth_config: auth::AuthConfig,
    secret: &SecretString,
) -> Result<()> {
    let store: Arc<dyn auth::AuthStore> = if let Some(dsn) = dsn {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(&dsn)
            .await
            .context("Failed to connect to database")?;
        Arc::new(auth::PgStore::new(pool))
    } else {
        warn!("No DSN configured; using the in-memory store (development only)");
        Arc::new(auth::MemoryStore::new())
    };

    serve(port, store, auth_config, secret).await
}

/// Serve the router on `port` with an already-constructed store.
///
/// # Errors
///
/// Returns an error if router construction or the listener bind fails.
pub async fn serve(
    port: u16,
    store: Arc<dyn auth::AuthStore>,
    auth_config: auth::AuthConfig,
    secret: &SecretString,
) -> Result<()> {
    let rate_limiter = Arc::new(auth::FixedWindowRateLimiter::new(
        auth_config.general_window(),
        auth_config.login_window(),
    ));
    let auth_state = Arc::new(auth::AuthState::new(
        auth_config,
        secret,
        store,
        rate_limiter,
    ));

    let app = router(auth_state)?;
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the full router. Exposed so tests can drive it directly.
///
/// # Errors
///
/// Returns an error if the configured frontend origin cannot be parsed.
pub fn router(auth_state: Arc<auth::AuthState>) -> Result<Router> {
    let frontend_origin = frontend_origin(auth_state.config().frontend_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(AllowOrigin::exact(frontend_origin))
        .allow_credentials(true);

    // Admin routes: rate limit -> authenticate -> admin gate -> handler.
    let admin_routes = Router::new()
        .route("/v1/admin/users", get(auth::admin::list_users))
        .route("/v1/admin/users/{id}/block", put(auth::admin::block_user))
        .route(
            "/v1/admin/users/{id}/unblock",
            put(auth::admin::unblock_user),
        )
        .route("/v1/admin/users/{id}/role", put(auth::admin::set_role))
        .route_layer(middleware::from_fn(auth::middleware::admin_only))
        .route_layer(middleware::from_fn(auth::middleware::require_auth));

    let session_routes = Router::new()
        .route("/v1/auth/session", get(auth::session::session))
        .route("/v1/auth/devices", get(auth::session::devices))
        .route_layer(middleware::from_fn(auth::middleware::require_auth));

    // Login and logout resolve their own credentials: login has no token
    // yet, and logout must not leave a device record behind.
    let public_routes = Router::new()
        .route("/v1/auth/login", post(auth::login::login))
        .route("/v1/auth/logout", post(auth::login::logout));

    let app = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn(auth::middleware::rate_limit))
        .route("/", get(root::root))
        .route("/health", get(health::health).options(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state)),
        );

    Ok(app)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn frontend_origin(frontend_base_url: &str) -> Result<HeaderValue> {
    let parsed = Url::parse(frontend_base_url)
        .with_context(|| format!("Invalid frontend base URL: {frontend_base_url}"))?;
    let host = parsed.host_str().ok_or_else(|| {
        anyhow!("Frontend base URL must include a valid host: {frontend_base_url}")
    })?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build frontend origin header")
}
