//! Best-effort device provenance tracking.
//!
//! Tracking is telemetry, not a security control: it must never fail or
//! delay authentication. Failures are logged and swallowed.

use chrono::Utc;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::store::AuthStore;

#[derive(Clone)]
pub struct DeviceTracker {
    store: Arc<dyn AuthStore>,
}

impl DeviceTracker {
    pub(crate) fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Record a `(user_agent, ip)` sighting off the request path and return
    /// immediately. The upsert may complete after the response is sent.
    pub fn record(&self, user_id: Uuid, user_agent: Option<&str>, ip_address: Option<&str>) {
        let store = Arc::clone(&self.store);
        let user_agent = user_agent.unwrap_or("unknown").to_string();
        let ip_address = ip_address.unwrap_or("unknown").to_string();
        tokio::spawn(async move {
            let seen_at = Utc::now();
            if let Err(err) = store
                .upsert_device(user_id, &user_agent, &ip_address, seen_at)
                .await
            {
                error!("Device tracking failed for {user_id}: {err}");
            }
        });
    }

    /// Record a sighting and wait for the upsert. Still swallows errors;
    /// used where the record should be visible in the response (login).
    pub async fn record_now(
        &self,
        user_id: Uuid,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
    ) {
        let seen_at = Utc::now();
        if let Err(err) = self
            .store
            .upsert_device(
                user_id,
                user_agent.unwrap_or("unknown"),
                ip_address.unwrap_or("unknown"),
                seen_at,
            )
            .await
        {
            error!("Device tracking failed for {user_id}: {err}");
        }
    }
}
