//! Bearer token signing and verification.
//!
//! Tokens are HS256 JWTs carrying `{sub, iat, exp}`. Verification is pure
//! and stateless; revocation and account state are the caller's concern.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Token id; makes every issued token unique, so revoking one login's
    /// token never affects a later login in the same second.
    pub jti: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

/// Signs and verifies bearer tokens with a server-held secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
    validation: Validation,
}

impl TokenCodec {
    /// The secret must be validated as non-empty at startup; an empty key
    /// here would sign every token with a guessable value.
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No clock leeway: expiry boundaries are exact.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret.expose_secret().as_bytes()),
            decoding: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            ttl_seconds,
            validation,
        }
    }

    /// Issue a signed token for `subject` with `iat = now` and
    /// `exp = now + TTL`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` if encoding fails.
    pub fn issue(&self, subject: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.ttl_seconds)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Invalid)
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// # Errors
    ///
    /// `TokenError::Expired` when `exp` has passed, `TokenError::Invalid`
    /// for any signature or shape problem.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
