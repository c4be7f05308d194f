//! Store abstractions for users, revocations, and device provenance.
//!
//! The auth surface never touches a concrete backend: it is handed an
//! [`AuthStore`] at startup, so tests can substitute the in-memory
//! implementation and production a shared Postgres instance.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// User record as the session core sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub is_blocked: bool,
}

/// Credential material for the login boundary. The hash is an argon2 PHC
/// string and never leaves the login handler.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Payload for creating a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// One `(user_agent, ip)` sighting for a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRecord {
    pub user_agent: String,
    pub ip_address: String,
    pub last_seen_at: DateTime<Utc>,
}

/// Backend failure. Mapped to 503 at the HTTP boundary, never conflated
/// with a security decision such as "revoked" or "not found".
#[derive(Debug, thiserror::Error)]
#[error("store operation failed: {0}")]
pub struct StoreError(#[from] pub anyhow::Error);

/// Read/write access to user identity records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn load_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn lookup_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Returns the updated record, or `None` when the user does not exist.
    async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<Option<User>, StoreError>;

    /// Returns the updated record, or `None` when the user does not exist.
    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<Option<User>, StoreError>;

    /// Cheap backend liveness probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Per-user set of revoked token strings.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Idempotent append: revoking an already-revoked token is a no-op.
    /// `expires_at` is the token's own expiry; entries past it may be
    /// pruned, since the codec refuses such tokens anyway.
    async fn revoke(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn is_revoked(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError>;
}

/// Per-user device history.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Upsert keyed by `(user_agent, ip_address)`, refreshing
    /// `last_seen_at`. Last writer wins by timestamp.
    async fn upsert_device(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn list_devices(&self, user_id: Uuid) -> Result<Vec<DeviceRecord>, StoreError>;
}

/// Everything the auth surface needs from one backing store.
pub trait AuthStore: UserStore + RevocationStore + DeviceStore {}

impl<T: UserStore + RevocationStore + DeviceStore> AuthStore for T {}

#[cfg(test)]
mod tests {
    use super::{StoreError, User};
    use uuid::Uuid;

    #[test]
    fn store_error_carries_context() {
        let err = StoreError(anyhow::anyhow!("connection refused"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn user_equality_covers_flags() {
        let user = User {
            id: Uuid::nil(),
            email: "a@example.com".to_string(),
            name: "A".to_string(),
            is_admin: false,
            is_blocked: false,
        };
        let mut blocked = user.clone();
        blocked.is_blocked = true;
        assert_ne!(user, blocked);
    }
}
