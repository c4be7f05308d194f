//! Authenticated identity and role gating.
//!
//! The identity is constructed once by the auth gate and attached to the
//! request; downstream handlers read it, they never mutate it. Role checks
//! read the user record resolved at authentication time, so a role change
//! takes effect on the next request even for an already-issued token.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::error::AuthError;
use super::store::User;
use super::token::Claims;

/// Authenticated user context attached to the request by the auth
/// middleware.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user: User,
    /// The raw bearer token exactly as presented.
    pub token: String,
    pub claims: Claims,
}

/// Admin gate. Pure predicate over the identity, no side effects.
///
/// # Errors
///
/// Returns `AuthError::Forbidden` when the identity is not an admin.
pub fn require_admin(identity: &Identity) -> Result<(), AuthError> {
    if identity.user.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthError, Identity, require_admin};
    use crate::api::handlers::auth::store::User;
    use crate::api::handlers::auth::token::Claims;
    use uuid::Uuid;

    fn identity(is_admin: bool) -> Identity {
        let id = Uuid::new_v4();
        Identity {
            user: User {
                id,
                email: "alice@example.com".to_string(),
                name: "Alice".to_string(),
                is_admin,
                is_blocked: false,
            },
            token: "token".to_string(),
            claims: Claims {
                sub: id.to_string(),
                iat: 0,
                exp: i64::MAX,
                jti: "test-token-id".to_string(),
            },
        }
    }

    #[test]
    fn admin_passes() {
        assert!(require_admin(&identity(true)).is_ok());
    }

    #[test]
    fn non_admin_is_forbidden() {
        assert!(matches!(
            require_admin(&identity(false)),
            Err(AuthError::Forbidden)
        ));
    }
}
