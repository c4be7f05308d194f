//! # Mercato (E-commerce Backend API)
//!
//! `mercato` is the backend for the Mercato storefront. Catalog and order
//! surfaces are thin CRUD consumers; the subsystem that carries the real
//! design weight, and the one implemented here, is **session and token
//! integrity**:
//!
//! - Bearer tokens are HS256 JWTs carrying `{sub, iat, exp}`, signed with a
//!   server-held secret that must be configured before the process starts.
//! - A token is honored iff its signature verifies, it has not expired, its
//!   subject still exists and is not blocked, and it has not been revoked.
//!   Each failure maps to a distinct error and HTTP status.
//! - Logout appends the presented token to the subject's revoked set;
//!   revocation is idempotent and permanent for that token's lifetime.
//! - `(user_agent, ip)` sightings are tracked per user as best-effort
//!   telemetry that never fails a request.
//! - Traffic is throttled per client IP with a general bucket
//!   (100 requests / 15 minutes) and a tight login bucket
//!   (5 attempts / 60 minutes).
//!
//! ## Stores
//!
//! User, revocation, and device state live behind injected store traits:
//! production runs on Postgres, tests and DSN-less development on the
//! in-memory implementation. Backend failure during authentication is
//! reported as 503, never as an auth decision.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
