//! Credential login and token revocation endpoints.

use argon2::{Argon2, PasswordVerifier, password_hash::PasswordHash};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

use super::error::AuthError;
use super::rate_limit::{RateBucket, RateDecision};
use super::state::AuthState;
use super::types::{LoginRequest, LoginResponse, MessageResponse, UserSummary};
use super::utils::{extract_client_ip, extract_user_agent, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = MessageResponse),
        (status = 403, description = "Account blocked", body = MessageResponse),
        (status = 429, description = "Too many login attempts", body = MessageResponse),
        (status = 503, description = "Backend unavailable", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    // Login attempts are charged against the tight bucket whether or not
    // the credentials turn out to be valid.
    let client_ip = extract_client_ip(&headers);
    if let RateDecision::Limited { retry_after } = auth_state
        .rate_limiter()
        .check(client_ip.as_deref(), RateBucket::Login)
    {
        return AuthError::RateLimited {
            bucket: RateBucket::Login,
            retry_after,
        }
        .into_response();
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return invalid_credentials();
    }

    let credentials = match auth_state.store().lookup_credentials(&email).await {
        Ok(Some(credentials)) => credentials,
        Ok(None) => return invalid_credentials(),
        Err(err) => return AuthError::from(err).into_response(),
    };
    if !password_matches(&request.password, &credentials.password_hash) {
        return invalid_credentials();
    }

    let user = credentials.user;
    if user.is_blocked {
        return AuthError::AccountBlocked.into_response();
    }

    let token = match auth_state.gate().codec().issue(user.id) {
        Ok(token) => token,
        Err(err) => {
            error!("Token issue failed for {}: {err}", user.id);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(MessageResponse {
                    success: false,
                    message: "Login failed".to_string(),
                }),
            )
                .into_response();
        }
    };

    // Recorded before the response so the new device shows up immediately;
    // a failure here still never fails the login.
    auth_state
        .devices()
        .record_now(
            user.id,
            extract_user_agent(&headers).as_deref(),
            client_ip.as_deref(),
        )
        .await;

    info!("User {} logged in", user.id);
    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            token,
            user: UserSummary::from(&user),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 401, description = "Token invalid, expired, or already revoked", body = MessageResponse),
        (status = 503, description = "Backend unavailable", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());

    // Logout authenticates without recording a device sighting.
    let identity = match auth_state.gate().authenticate(header).await {
        Ok(identity) => identity,
        Err(err) => return err.into_response(),
    };

    let expires_at = DateTime::<Utc>::from_timestamp(identity.claims.exp, 0)
        .unwrap_or_else(Utc::now);
    if let Err(err) = auth_state
        .store()
        .revoke(identity.user.id, &identity.token, expires_at)
        .await
    {
        return AuthError::from(err).into_response();
    }

    info!("User {} logged out", identity.user.id);
    (
        StatusCode::OK,
        Json(MessageResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
        .into_response()
}

fn invalid_credentials() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(MessageResponse {
            success: false,
            message: "Invalid email or password".to_string(),
        }),
    )
        .into_response()
}

fn password_matches(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
