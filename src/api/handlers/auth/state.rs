//! Auth configuration and shared state.

use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

use super::devices::DeviceTracker;
use super::gate::AuthGate;
use super::rate_limit::{RateLimiter, WindowConfig};
use super::store::AuthStore;
use super::token::TokenCodec;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_GENERAL_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_GENERAL_MAX_REQUESTS: u32 = 100;
const DEFAULT_LOGIN_WINDOW_SECONDS: u64 = 60 * 60;
const DEFAULT_LOGIN_MAX_REQUESTS: u32 = 5;
const DEFAULT_FRONTEND_BASE_URL: &str = "https://shop.mercato.dev";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    token_ttl_seconds: i64,
    general_window: WindowConfig,
    login_window: WindowConfig,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            general_window: WindowConfig {
                window: Duration::from_secs(DEFAULT_GENERAL_WINDOW_SECONDS),
                max_requests: DEFAULT_GENERAL_MAX_REQUESTS,
            },
            login_window: WindowConfig {
                window: Duration::from_secs(DEFAULT_LOGIN_WINDOW_SECONDS),
                max_requests: DEFAULT_LOGIN_MAX_REQUESTS,
            },
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_general_window(mut self, window_seconds: u64, max_requests: u32) -> Self {
        self.general_window = WindowConfig {
            window: Duration::from_secs(window_seconds),
            max_requests,
        };
        self
    }

    #[must_use]
    pub fn with_login_window(mut self, window_seconds: u64, max_requests: u32) -> Self {
        self.login_window = WindowConfig {
            window: Duration::from_secs(window_seconds),
            max_requests,
        };
        self
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub fn general_window(&self) -> WindowConfig {
        self.general_window
    }

    #[must_use]
    pub fn login_window(&self) -> WindowConfig {
        self.login_window
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

/// Shared state for the auth surface: the gate, the injected store, the
/// rate limiter, and the device tracker.
pub struct AuthState {
    config: AuthConfig,
    gate: AuthGate,
    store: Arc<dyn AuthStore>,
    rate_limiter: Arc<dyn RateLimiter>,
    devices: DeviceTracker,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        secret: &SecretString,
        store: Arc<dyn AuthStore>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let codec = TokenCodec::new(secret, config.token_ttl_seconds());
        let gate = AuthGate::new(codec, Arc::clone(&store));
        let devices = DeviceTracker::new(Arc::clone(&store));
        Self {
            config,
            gate,
            store,
            rate_limiter,
            devices,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    #[must_use]
    pub fn store(&self) -> &dyn AuthStore {
        self.store.as_ref()
    }

    pub(crate) fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    #[must_use]
    pub fn devices(&self) -> &DeviceTracker {
        &self.devices
    }
}
