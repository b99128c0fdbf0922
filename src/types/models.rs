use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RoleFlags;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub entity_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub banned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
    pub roles: RoleFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user together with the department and entity rows it points at.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithScope {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<Department>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassType {
    Item,
    Quantity,
}

impl ClassType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ClassType::Item => "item",
            ClassType::Quantity => "quantity",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "item" => Some(ClassType::Item),
            "quantity" => Some(ClassType::Quantity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetClass {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub department_id: i64,
    pub class_type: ClassType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetState {
    Idle,
    Acquired,
    Maintained,
    Expired,
}

impl AssetState {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssetState::Idle => "idle",
            AssetState::Acquired => "acquired",
            AssetState::Maintained => "maintained",
            AssetState::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(AssetState::Idle),
            "acquired" => Some(AssetState::Acquired),
            "maintained" => Some(AssetState::Maintained),
            "expired" => Some(AssetState::Expired),
            _ => None,
        }
    }

    /// States in which an asset may carry a holder.
    #[must_use]
    pub const fn admits_holder(self) -> bool {
        matches!(self, AssetState::Acquired | AssetState::Maintained)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub class_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub department_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_id: Option<i64>,
    pub state: AssetState,
    pub price: f64,
    pub number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Import,
    Export,
    LogExport,
}

impl TaskType {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskType::Import => "import",
            TaskType::Export => "export",
            TaskType::LogExport => "log_export",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "import" => Some(TaskType::Import),
            "export" => Some(TaskType::Export),
            "log_export" => Some(TaskType::LogExport),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failed,
}

impl TaskState {
    pub const fn as_str(self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Success => "success",
            TaskState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskState::Pending),
            "running" => Some(TaskState::Running),
            "success" => Some(TaskState::Success),
            "failed" => Some(TaskState::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncTask {
    pub id: i64,
    pub task_type: TaskType,
    pub issuer_id: i64,
    pub department_id: i64,
    pub entity_id: i64,
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStat {
    pub department_id: i64,
    pub total: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Identity of the caller as produced by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorClaims {
    pub user_id: i64,
    pub username: String,
    pub roles: RoleFlags,
    pub entity_id: Option<i64>,
    pub department_id: Option<i64>,
}

impl From<&User> for ActorClaims {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            roles: user.roles,
            entity_id: user.entity_id,
            department_id: user.department_id,
        }
    }
}
