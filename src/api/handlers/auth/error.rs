//! Typed authentication failures and their HTTP mapping.
//!
//! Every variant is recoverable at the HTTP boundary. Backend failure is a
//! distinct 503, never reported as "revoked" or "not found": conflating an
//! infrastructure problem with a security decision would be a correctness
//! bug.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::time::Duration;
use tracing::error;

use super::rate_limit::RateBucket;
use super::store::StoreError;
use super::token::TokenError;

/// Why a request was refused by the session/token core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header missing or malformed")]
    MissingToken,
    #[error("token signature or shape invalid")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    #[error("token revoked")]
    TokenRevoked,
    #[error("token subject no longer exists")]
    UserNotFound,
    #[error("account blocked")]
    AccountBlocked,
    #[error("administrator privileges required")]
    Forbidden,
    #[error("too many requests")]
    RateLimited {
        bucket: RateBucket,
        retry_after: Duration,
    },
    #[error("authentication backend unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::TokenRevoked
            | Self::UserNotFound => StatusCode::UNAUTHORIZED,
            Self::AccountBlocked | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-facing message. Kinds stay distinct internally; the message
    /// for a missing subject is deliberately indistinguishable from a bad
    /// token to avoid account enumeration.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingToken => "Authentication required",
            Self::InvalidToken | Self::UserNotFound => "Invalid token",
            Self::TokenExpired => "Token expired",
            Self::TokenRevoked => "Token revoked",
            Self::AccountBlocked => "Account is blocked",
            Self::Forbidden => "Admin access required",
            Self::RateLimited {
                bucket: RateBucket::General,
                ..
            } => "Too many requests, please try again later",
            Self::RateLimited {
                bucket: RateBucket::Login,
                ..
            } => "Too many login attempts, please try again later",
            Self::Unavailable(_) => "Service temporarily unavailable",
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid => Self::InvalidToken,
            TokenError::Expired => Self::TokenExpired,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Unavailable(err.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Unavailable(ref source) = self {
            error!("Auth backend unavailable: {source:#}");
        }

        let body = match &self {
            Self::RateLimited { bucket, .. } => json!({
                "success": false,
                "message": self.message(),
                "code": bucket.code(),
            }),
            _ => json!({
                "success": false,
                "message": self.message(),
            }),
        };

        let mut response = (self.status(), Json(body)).into_response();
        if let Self::RateLimited { retry_after, .. } = &self {
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
