//! Request/response types for the auth and admin endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::store::{DeviceRecord, User};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User summary returned to clients. Never carries credential material.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub is_blocked: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            is_admin: user.is_admin,
            is_blocked: user.is_blocked,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: UserSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeviceSummary {
    pub user_agent: String,
    pub ip_address: String,
    pub last_seen_at: DateTime<Utc>,
}

impl From<&DeviceRecord> for DeviceSummary {
    fn from(record: &DeviceRecord) -> Self {
        Self {
            user_agent: record.user_agent.clone(),
            ip_address: record.ip_address.clone(),
            last_seen_at: record.last_seen_at,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct DeviceListResponse {
    pub success: bool,
    pub devices: Vec<DeviceSummary>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserListResponse {
    pub success: bool,
    pub users: Vec<UserSummary>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RoleUpdateRequest {
    pub is_admin: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}
