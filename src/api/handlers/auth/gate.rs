//! Request authentication: bearer parsing and the ordered validity checks.

use std::sync::Arc;
use uuid::Uuid;

use super::error::AuthError;
use super::principal::Identity;
use super::store::AuthStore;
use super::token::TokenCodec;

/// Resolves `Authorization` headers into authenticated identities.
///
/// Checks run cheapest first: header shape, then signature and expiry, and
/// only then the user and revocation lookups. Malformed or expired tokens
/// never touch the store.
pub struct AuthGate {
    codec: TokenCodec,
    store: Arc<dyn AuthStore>,
}

impl AuthGate {
    #[must_use]
    pub fn new(codec: TokenCodec, store: Arc<dyn AuthStore>) -> Self {
        Self { codec, store }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Authenticate a raw `Authorization` header value.
    ///
    /// A token is accepted iff its signature verifies, it has not expired,
    /// its subject exists and is not blocked, and it is absent from the
    /// subject's revoked set. Each failure maps to a distinct
    /// [`AuthError`]; store trouble surfaces as `Unavailable`.
    ///
    /// # Errors
    ///
    /// See [`AuthError`] for the full taxonomy.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let token = extract_bearer_token(header).ok_or(AuthError::MissingToken)?;
        let claims = self.codec.verify(&token)?;
        let subject = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .store
            .load_user(subject)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if user.is_blocked {
            return Err(AuthError::AccountBlocked);
        }
        if self.store.is_revoked(subject, &token).await? {
            return Err(AuthError::TokenRevoked);
        }

        Ok(Identity {
            user,
            token,
            claims,
        })
    }
}

fn extract_bearer_token(header: Option<&str>) -> Option<String> {
    let trimmed = header?.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
