//! Admin-only user management endpoints.
//!
//! All routes here sit behind the auth and admin middleware. Blocking a
//! user takes effect on that user's very next request: the gate reads the
//! flag fresh, so every outstanding token dies with the account.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{MessageResponse, RoleUpdateRequest, UserListResponse, UserSummary};

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    responses(
        (status = 200, description = "All user accounts", body = UserListResponse),
        (status = 401, description = "Not authenticated", body = MessageResponse),
        (status = 403, description = "Not an admin", body = MessageResponse),
        (status = 503, description = "Backend unavailable", body = MessageResponse)
    ),
    tag = "admin"
)]
pub async fn list_users(auth_state: Extension<Arc<AuthState>>) -> Response {
    match auth_state.store().list_users().await {
        Ok(users) => (
            StatusCode::OK,
            Json(UserListResponse {
                success: true,
                users: users.iter().map(UserSummary::from).collect(),
            }),
        )
            .into_response(),
        Err(err) => AuthError::from(err).into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/v1/admin/users/{id}/block",
    params(("id" = Uuid, Path, description = "User to block")),
    responses(
        (status = 200, description = "User blocked", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse)
    ),
    tag = "admin"
)]
pub async fn block_user(
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> Response {
    set_blocked(&auth_state, id, true).await
}

#[utoipa::path(
    put,
    path = "/v1/admin/users/{id}/unblock",
    params(("id" = Uuid, Path, description = "User to unblock")),
    responses(
        (status = 200, description = "User unblocked", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse)
    ),
    tag = "admin"
)]
pub async fn unblock_user(
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
) -> Response {
    set_blocked(&auth_state, id, false).await
}

#[utoipa::path(
    put,
    path = "/v1/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User whose role changes")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role updated", body = MessageResponse),
        (status = 404, description = "Unknown user", body = MessageResponse)
    ),
    tag = "admin"
)]
pub async fn set_role(
    auth_state: Extension<Arc<AuthState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<RoleUpdateRequest>,
) -> Response {
    match auth_state.store().set_admin(id, request.is_admin).await {
        Ok(Some(user)) => {
            info!("User {} is_admin set to {}", user.id, user.is_admin);
            message(StatusCode::OK, true, "Role updated")
        }
        Ok(None) => user_not_found(),
        Err(err) => AuthError::from(err).into_response(),
    }
}

async fn set_blocked(auth_state: &AuthState, id: Uuid, blocked: bool) -> Response {
    match auth_state.store().set_blocked(id, blocked).await {
        Ok(Some(user)) => {
            info!("User {} is_blocked set to {}", user.id, user.is_blocked);
            let text = if blocked { "User blocked" } else { "User unblocked" };
            message(StatusCode::OK, true, text)
        }
        Ok(None) => user_not_found(),
        Err(err) => AuthError::from(err).into_response(),
    }
}

fn user_not_found() -> Response {
    message(StatusCode::NOT_FOUND, false, "User not found")
}

fn message(status: StatusCode, success: bool, text: &str) -> Response {
    (
        status,
        Json(MessageResponse {
            success,
            message: text.to_string(),
        }),
    )
        .into_response()
}
