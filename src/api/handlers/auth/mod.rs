//! Session and token integrity.
//!
//! Flow Overview: every inbound `/v1` request passes the rate limiter, then
//! the auth gate resolves the bearer token into an [`Identity`] (signature,
//! expiry, user existence, block flag, revocation, in that order), and
//! admin routes add a pure role check on top. Logins issue tokens; logouts
//! append them to the caller's revoked set. Device sightings are recorded
//! as best-effort telemetry off the request path.

pub mod admin;
pub mod devices;
pub mod error;
pub mod gate;
pub mod login;
pub mod memory;
pub mod middleware;
pub mod postgres;
pub mod principal;
pub mod rate_limit;
pub mod session;
pub mod state;
pub mod store;
pub mod token;
pub mod types;
pub(crate) mod utils;

#[cfg(test)]
mod tests;

pub use error::AuthError;
pub use gate::AuthGate;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use principal::{Identity, require_admin};
pub use rate_limit::{
    FixedWindowRateLimiter, NoopRateLimiter, RateBucket, RateDecision, RateLimiter, WindowConfig,
};
pub use state::{AuthConfig, AuthState};
pub use store::{AuthStore, DeviceRecord, NewUser, StoreError, User};
pub use token::TokenCodec;
