//! Postgres-backed store.
//!
//! Queries are bound at runtime and instrumented with `db.query` spans.
//! Schema lives in `sql/schema.sql`.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::store::{
    Credentials, DeviceRecord, DeviceStore, NewUser, RevocationStore, StoreError, User, UserStore,
};

/// Device history kept per user, matching the in-memory store.
const DEVICE_HISTORY_CAP: i64 = 20;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        is_admin: row.get("is_admin"),
        is_blocked: row.get("is_blocked"),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn load_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = "SELECT id, email, name, is_admin, is_blocked FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to load user")?;
        Ok(row.map(|row| user_from_row(&row)))
    }

    async fn lookup_credentials(&self, email: &str) -> Result<Option<Credentials>, StoreError> {
        let query = r"
            SELECT id, email, name, is_admin, is_blocked, password_hash
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup credentials")?;
        Ok(row.map(|row| Credentials {
            user: user_from_row(&row),
            password_hash: row.get("password_hash"),
        }))
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let query = r"
            INSERT INTO users (email, name, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, is_admin, is_blocked
        ";
        let row = sqlx::query(query)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert user")?;
        Ok(user_from_row(&row))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let query =
            "SELECT id, email, name, is_admin, is_blocked FROM users ORDER BY email";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list users")?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn set_blocked(&self, id: Uuid, blocked: bool) -> Result<Option<User>, StoreError> {
        let query = r"
            UPDATE users
            SET is_blocked = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, is_admin, is_blocked
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(blocked)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update blocked flag")?;
        Ok(row.map(|row| user_from_row(&row)))
    }

    async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<Option<User>, StoreError> {
        let query = r"
            UPDATE users
            SET is_admin = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, is_admin, is_blocked
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(is_admin)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update admin flag")?;
        Ok(row.map(|row| user_from_row(&row)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for PgStore {
    async fn revoke(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Piggyback pruning of entries whose token has expired on its own.
        let query = "DELETE FROM revoked_tokens WHERE user_id = $1 AND expires_at < NOW()";
        sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to prune revoked tokens")?;

        // Idempotent: replaying a revoke is a no-op.
        let query = r"
            INSERT INTO revoked_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, token) DO NOTHING
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert revoked token")?;
        Ok(())
    }

    async fn is_revoked(&self, user_id: Uuid, token: &str) -> Result<bool, StoreError> {
        let query = "SELECT 1 FROM revoked_tokens WHERE user_id = $1 AND token = $2 LIMIT 1";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to check revocation")?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl DeviceStore for PgStore {
    async fn upsert_device(
        &self,
        user_id: Uuid,
        user_agent: &str,
        ip_address: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // GREATEST keeps the freshest sighting when concurrent updates race.
        let query = r"
            INSERT INTO user_devices (user_id, user_agent, ip_address, last_seen_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, user_agent, ip_address)
            DO UPDATE SET last_seen_at = GREATEST(user_devices.last_seen_at, EXCLUDED.last_seen_at)
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(user_agent)
            .bind(ip_address)
            .bind(seen_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to upsert device record")?;

        let query = r"
            DELETE FROM user_devices
            WHERE user_id = $1
              AND id NOT IN (
                SELECT id FROM user_devices
                WHERE user_id = $1
                ORDER BY last_seen_at DESC
                LIMIT $2
              )
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(DEVICE_HISTORY_CAP)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to trim device history")?;
        Ok(())
    }

    async fn list_devices(&self, user_id: Uuid) -> Result<Vec<DeviceRecord>, StoreError> {
        let query = r"
            SELECT user_agent, ip_address, last_seen_at
            FROM user_devices
            WHERE user_id = $1
            ORDER BY last_seen_at DESC
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list devices")?;
        Ok(rows
            .iter()
            .map(|row| DeviceRecord {
                user_agent: row.get("user_agent"),
                ip_address: row.get("ip_address"),
                last_seen_at: row.get("last_seen_at"),
            })
            .collect())
    }
}
