//! OpenAPI document for the documented routes.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::login::login,
        crate::api::handlers::auth::login::logout,
        crate::api::handlers::auth::session::session,
        crate::api::handlers::auth::session::devices,
        crate::api::handlers::auth::admin::list_users,
        crate::api::handlers::auth::admin::block_user,
        crate::api::handlers::auth::admin::unblock_user,
        crate::api::handlers::auth::admin::set_role,
    ),
    components(schemas(
        crate::api::handlers::health::Health,
        crate::api::handlers::auth::types::LoginRequest,
        crate::api::handlers::auth::types::LoginResponse,
        crate::api::handlers::auth::types::SessionResponse,
        crate::api::handlers::auth::types::UserSummary,
        crate::api::handlers::auth::types::DeviceSummary,
        crate::api::handlers::auth::types::DeviceListResponse,
        crate::api::handlers::auth::types::UserListResponse,
        crate::api::handlers::auth::types::RoleUpdateRequest,
        crate::api::handlers::auth::types::MessageResponse,
    )),
    tags(
        (name = "auth", description = "Session and token endpoints"),
        (name = "admin", description = "Admin-only user management"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
