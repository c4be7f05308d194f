//! Route-level middleware for throttling and authentication.

use axum::{
    extract::{Extension, Request},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::error::AuthError;
use super::principal::{Identity, require_admin};
use super::rate_limit::{RateBucket, RateDecision};
use super::state::AuthState;
use super::utils::{extract_client_ip, extract_user_agent};

/// Charge every request against the general bucket before any other work.
pub async fn rate_limit(
    Extension(state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(request.headers());
    match state.rate_limiter().check(ip.as_deref(), RateBucket::General) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Limited { retry_after } => AuthError::RateLimited {
            bucket: RateBucket::General,
            retry_after,
        }
        .into_response(),
    }
}

/// Authenticate the bearer token and attach the [`Identity`] to the
/// request. A device sighting is recorded after success, off the response
/// path. Logout does not run behind this middleware: it authenticates on
/// its own so no device record is written for it.
pub async fn require_auth(
    Extension(state): Extension<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let identity = match state.gate().authenticate(header.as_deref()).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let user_agent = extract_user_agent(request.headers());
    let ip = extract_client_ip(request.headers());
    state
        .devices()
        .record(identity.user.id, user_agent.as_deref(), ip.as_deref());

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Refuse non-admin identities. Must be layered inside [`require_auth`].
pub async fn admin_only(request: Request, next: Next) -> Response {
    match request.extensions().get::<Identity>() {
        Some(identity) => {
            if let Err(err) = require_admin(identity) {
                return err.into_response();
            }
            next.run(request).await
        }
        None => AuthError::MissingToken.into_response(),
    }
}
