//! Request throttling keyed by client IP.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Which counter a request is charged against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateBucket {
    /// All API traffic.
    General,
    /// Login attempts; a much tighter window.
    Login,
}

impl RateBucket {
    /// Machine-readable code included in 429 responses.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::General => "RATE_LIMIT_EXCEEDED",
            Self::Login => "LOGIN_LIMIT_EXCEEDED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Limited { retry_after: Duration },
}

pub trait RateLimiter: Send + Sync {
    /// Charge one request against `(ip, bucket)` and decide whether it may
    /// proceed. Requests without a resolvable IP share a fallback key.
    fn check(&self, ip: Option<&str>, bucket: RateBucket) -> RateDecision;
}

/// Limiter that never refuses.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _ip: Option<&str>, _bucket: RateBucket) -> RateDecision {
        RateDecision::Allowed
    }
}

/// Window size and threshold for one bucket.
#[derive(Clone, Copy, Debug)]
pub struct WindowConfig {
    pub window: Duration,
    pub max_requests: u32,
}

struct Window {
    started_at: Instant,
    count: u32,
}

/// Fixed-window counters per `(ip, bucket)`.
///
/// Counters are created lazily on the first request of a window and
/// incremented under the map lock, so concurrent bursts for the same key
/// never undercount. A counter resets when its window elapses, regardless
/// of the outcome of the requests it counted. Elapsed windows are pruned on
/// every check so the map stays bounded by currently active clients.
pub struct FixedWindowRateLimiter {
    general: WindowConfig,
    login: WindowConfig,
    windows: Mutex<HashMap<(String, RateBucket), Window>>,
}

impl FixedWindowRateLimiter {
    #[must_use]
    pub fn new(general: WindowConfig, login: WindowConfig) -> Self {
        Self {
            general,
            login,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn config(&self, bucket: RateBucket) -> WindowConfig {
        match bucket {
            RateBucket::General => self.general,
            RateBucket::Login => self.login,
        }
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    fn check(&self, ip: Option<&str>, bucket: RateBucket) -> RateDecision {
        let config = self.config(bucket);
        let key = (ip.unwrap_or("unknown").to_string(), bucket);
        let now = Instant::now();

        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        windows.retain(|(_, entry_bucket), window| {
            now.duration_since(window.started_at) < self.config(*entry_bucket).window
        });

        let window = windows.entry(key).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now.duration_since(window.started_at) >= config.window {
            window.started_at = now;
            window.count = 0;
        }
        window.count = window.count.saturating_add(1);

        if window.count > config.max_requests {
            let elapsed = now.duration_since(window.started_at);
            RateDecision::Limited {
                retry_after: config.window.saturating_sub(elapsed),
            }
        } else {
            RateDecision::Allowed
        }
    }
}
