//! Session introspection endpoints for authenticated callers.

use axum::{Json, extract::Extension, http::StatusCode, response::{IntoResponse, Response}};
use std::sync::Arc;

use super::error::AuthError;
use super::principal::Identity;
use super::state::AuthState;
use super::types::{DeviceListResponse, DeviceSummary, SessionResponse, UserSummary};

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "Not authenticated", body = super::types::MessageResponse)
    ),
    tag = "auth"
)]
pub async fn session(identity: Identity) -> Response {
    // The user record was read fresh by the gate, so role and block flags
    // are current even for a token issued before they changed.
    (
        StatusCode::OK,
        Json(SessionResponse {
            success: true,
            user: UserSummary::from(&identity.user),
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/auth/devices",
    responses(
        (status = 200, description = "Devices recently seen for this account", body = DeviceListResponse),
        (status = 401, description = "Not authenticated", body = super::types::MessageResponse),
        (status = 503, description = "Backend unavailable", body = super::types::MessageResponse)
    ),
    tag = "auth"
)]
pub async fn devices(identity: Identity, auth_state: Extension<Arc<AuthState>>) -> Response {
    match auth_state.store().list_devices(identity.user.id).await {
        Ok(devices) => (
            StatusCode::OK,
            Json(DeviceListResponse {
                success: true,
                devices: devices.iter().map(DeviceSummary::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => AuthError::from(err).into_response(),
    }
}
