mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Selects which users a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Entity(i64),
    Department(i64),
}

/// Selects which assets a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFilter {
    /// Non-expired assets of one department.
    ActiveInDepartment(i64),
    Owner(i64),
    Maintainer(i64),
}

/// Selects which async tasks a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    Issuer(i64),
    Department(i64),
    Entity(i64),
}

/// Callback applied to each asset of a bulk lifecycle transition.
pub type AssetTransition<'a> = dyn FnMut(&mut Asset) -> Result<()> + 'a;

/// Callback applied to an async task before its state is written back.
pub type TaskTransition<'a> = dyn FnMut(&mut AsyncTask) -> Result<()> + 'a;

/// Store defines the database interface.
///
/// Methods that check before they write run the check and the write in one
/// transaction and return the domain error of the failed check.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Entity operations
    fn create_entity(&self, name: &str) -> Result<Entity>;
    fn get_entity(&self, id: i64) -> Result<Option<Entity>>;
    fn get_entity_by_name(&self, name: &str) -> Result<Option<Entity>>;
    fn list_entities(&self) -> Result<Vec<Entity>>;
    /// Deletes an entity and everything scoped to it: departments, asset
    /// classes, assets, tasks and stats go with it. Refused while users
    /// remain.
    fn delete_entity(&self, id: i64) -> Result<()>;

    // Department operations
    fn create_department(
        &self,
        name: &str,
        entity_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Department>;
    fn get_department(&self, id: i64) -> Result<Option<Department>>;
    fn list_departments(&self, entity_id: i64) -> Result<Vec<Department>>;
    fn delete_department(&self, id: i64) -> Result<()>;
    /// Moves a department subtree to another entity, detaching it from its
    /// old parent and moving the users of every moved department along.
    /// Returns the ids of the moved departments.
    fn rescope_department(&self, id: i64, entity_id: i64) -> Result<Vec<i64>>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn get_user_with_department_and_entity(&self, id: i64) -> Result<Option<UserWithScope>>;
    fn list_users(&self, filter: UserFilter, cursor: i64, limit: i64) -> Result<Vec<User>>;
    fn count_users(&self, filter: UserFilter) -> Result<u64>;
    fn set_user_password(&self, id: i64, password_hash: &str) -> Result<()>;
    fn set_user_banned(&self, id: i64, banned: bool) -> Result<()>;
    fn set_user_roles(&self, id: i64, roles: RoleFlags) -> Result<()>;
    fn set_user_scope(
        &self,
        id: i64,
        entity_id: Option<i64>,
        department_id: Option<i64>,
    ) -> Result<()>;
    fn delete_user(&self, id: i64) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Hierarchy operations, shared by departments, asset classes and assets
    fn get_node(&self, kind: TreeKind, id: i64) -> Result<TreeNode>;
    fn list_children(&self, kind: TreeKind, id: i64) -> Result<Vec<TreeNode>>;
    fn ancestor_chain(&self, kind: TreeKind, id: i64) -> Result<Vec<TreeNode>>;
    fn reparent(&self, kind: TreeKind, id: i64, parent_id: Option<i64>) -> Result<()>;
    fn build_tree(&self, kind: TreeKind, root: i64) -> Result<TreeView>;
    fn build_forest(&self, kind: TreeKind, scope_id: i64) -> Result<Vec<TreeView>>;

    // Asset class operations
    fn create_asset_class(
        &self,
        name: &str,
        department_id: i64,
        parent_id: Option<i64>,
        class_type: ClassType,
    ) -> Result<AssetClass>;
    fn get_asset_class(&self, id: i64) -> Result<Option<AssetClass>>;
    fn rename_asset_class(&self, id: i64, name: &str) -> Result<()>;
    fn delete_asset_class(&self, id: i64) -> Result<()>;

    // Asset operations
    /// Inserts each asset with its nested children and returns the ids of the
    /// top-level rows in input order.
    fn create_assets(
        &self,
        department_id: i64,
        parent_id: Option<i64>,
        assets: &[NewAsset],
    ) -> Result<Vec<i64>>;
    fn get_asset(&self, id: i64) -> Result<Option<Asset>>;
    fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>>;
    fn update_asset(&self, id: i64, update: &AssetUpdate) -> Result<Asset>;
    /// Deletes a leaf asset after `guard` accepts it.
    fn delete_asset(&self, id: i64, guard: &dyn Fn(&Asset) -> Result<()>) -> Result<()>;
    /// Applies `apply` to every listed asset and writes the results back, all
    /// or nothing. With `detach_descendants`, every descendant of a listed
    /// asset loses its parent link first.
    fn transition_assets(
        &self,
        ids: &[i64],
        detach_descendants: bool,
        apply: &mut AssetTransition<'_>,
    ) -> Result<Vec<Asset>>;

    // Statistics
    fn record_asset_stats(&self) -> Result<usize>;
    fn list_asset_stats(&self, department_id: i64) -> Result<Vec<AssetStat>>;

    // Async task operations
    fn create_task(&self, task: &NewTask) -> Result<AsyncTask>;
    fn get_task(&self, id: i64) -> Result<Option<AsyncTask>>;
    fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<AsyncTask>>;
    /// Loads a task, lets `apply` change it and writes it back atomically.
    fn update_task(&self, id: i64, apply: &mut TaskTransition<'_>) -> Result<AsyncTask>;

    fn close(&self) -> Result<()>;
}
