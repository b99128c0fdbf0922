use serde::Deserialize;

/// An asset to create, optionally with nested sub-assets.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAsset {
    pub name: String,
    pub class_id: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default = "default_number")]
    pub number: i64,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub children: Vec<NewAsset>,
}

fn default_number() -> i64 {
    1
}

/// Descriptive asset fields that may be patched in place.
///
/// Parent, department, holder and state change only through the hierarchy
/// and lifecycle operations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AssetUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.class_id.is_none()
            && self.price.is_none()
            && self.number.is_none()
            && self.position.is_none()
            && self.description.is_none()
    }
}

/// A user row to insert; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub entity_id: Option<i64>,
    pub department_id: Option<i64>,
    pub roles: super::RoleFlags,
}

/// An async task row to insert in the pending state.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_type: super::TaskType,
    pub issuer_id: i64,
    pub department_id: i64,
    pub entity_id: i64,
    pub download_link: Option<String>,
    pub object_key: Option<String>,
}
