use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{NewAsset, RoleFlags, TaskType, User};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: User,
}

/// Role flags as three independent booleans.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct RolesRequest {
    #[serde(default)]
    pub system_super: bool,
    #[serde(default)]
    pub entity_super: bool,
    #[serde(default)]
    pub department_super: bool,
}

impl From<RolesRequest> for RoleFlags {
    fn from(r: RolesRequest) -> Self {
        RoleFlags::from_parts(r.system_super, r.entity_super, r.department_super)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub entity_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub roles: RolesRequest,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: User,
    /// Present only when the server generated the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersParams {
    #[serde(default)]
    pub entity_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub cursor: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct BanRequest {
    pub banned: bool,
}

#[derive(Debug, Deserialize)]
pub struct EntityRequest {
    pub entity_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub department_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ParentRequest {
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDepartmentRequest {
    pub entity_id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClassRequest {
    pub name: String,
    pub class_type: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssetsRequest {
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub assets: Vec<NewAsset>,
}

#[derive(Debug, Deserialize)]
pub struct AssetIdsRequest {
    pub asset_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MaintainRequest {
    pub asset_ids: Vec<i64>,
    pub maintainer_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub asset_ids: Vec<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub department_id: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub task_type: TaskType,
    #[serde(default)]
    pub object_key: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModifyTaskStateRequest {
    pub state: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
}
