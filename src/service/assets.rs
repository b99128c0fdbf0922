use super::Services;
use super::validation::{validate_asset_update, validate_name, validate_new_assets};
use crate::error::{Error, Result};
use crate::permission::{self, Operation, TargetScope};
use crate::store::AssetFilter;
use crate::types::{
    ActorClaims, Asset, AssetClass, AssetStat, AssetUpdate, ClassType, NewAsset, TreeKind,
    TreeView,
};

/// Assets to create under one department, optionally below an existing
/// parent asset.
#[derive(Debug, Clone)]
pub struct AssetCreation {
    pub department_id: i64,
    pub parent_id: Option<i64>,
    pub assets: Vec<NewAsset>,
}

impl Services {
    // Asset classes

    pub fn create_asset_class(
        &self,
        actor: &ActorClaims,
        department_id: i64,
        name: &str,
        parent_id: Option<i64>,
        class_type: &str,
    ) -> Result<AssetClass> {
        let name = validate_name(name, Error::NameEmpty)?;
        let class_type = ClassType::parse(class_type).ok_or(Error::InvalidTypeOfClass)?;
        self.require_department(actor, department_id, Operation::Write)?;

        let class = self
            .store
            .create_asset_class(&name, department_id, parent_id, class_type)?;
        tracing::info!(
            actor = actor.user_id,
            class_id = class.id,
            department_id,
            "asset class created"
        );
        Ok(class)
    }

    pub fn get_asset_class(&self, actor: &ActorClaims, id: i64) -> Result<AssetClass> {
        let class = self.load_class(id)?;
        self.require_department_read(actor, class.department_id)?;
        Ok(class)
    }

    pub fn asset_class_tree(&self, actor: &ActorClaims, department_id: i64) -> Result<Vec<TreeView>> {
        self.require_department_read(actor, department_id)?;
        self.store.build_forest(TreeKind::AssetClass, department_id)
    }

    pub fn rename_asset_class(&self, actor: &ActorClaims, id: i64, name: &str) -> Result<AssetClass> {
        let name = validate_name(name, Error::NameEmpty)?;
        let class = self.load_class(id)?;
        self.require_department(actor, class.department_id, Operation::Write)?;

        self.store.rename_asset_class(id, &name)?;
        self.load_class(id)
    }

    pub fn reparent_asset_class(
        &self,
        actor: &ActorClaims,
        id: i64,
        parent_id: Option<i64>,
    ) -> Result<()> {
        let class = self.load_class(id)?;
        self.require_department(actor, class.department_id, Operation::Write)?;
        self.store.reparent(TreeKind::AssetClass, id, parent_id)
    }

    pub fn delete_asset_class(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        let class = self.load_class(id)?;
        self.require_department(actor, class.department_id, Operation::Write)?;
        self.store.delete_asset_class(id)
    }

    // Assets

    /// Creates assets with their nested children in one transaction and
    /// returns the top-level rows.
    pub fn create_assets(&self, actor: &ActorClaims, creation: &AssetCreation) -> Result<Vec<Asset>> {
        let assets = validate_new_assets(&creation.assets)?;
        self.require_department(actor, creation.department_id, Operation::Write)?;

        let ids = self
            .store
            .create_assets(creation.department_id, creation.parent_id, &assets)?;
        ids.into_iter().map(|id| self.load_asset(id)).collect()
    }

    pub fn get_asset(&self, actor: &ActorClaims, id: i64) -> Result<Asset> {
        let asset = self.load_asset(id)?;
        if actor.department_id != Some(asset.department_id) {
            let target = self.scopes.asset_target(&asset)?;
            permission::require(actor, &target, Operation::Read)?;
        }
        Ok(asset)
    }

    /// Non-expired assets of a department.
    pub fn list_department_assets(&self, actor: &ActorClaims, department_id: i64) -> Result<Vec<Asset>> {
        self.require_department_read(actor, department_id)?;
        self.store
            .list_assets(AssetFilter::ActiveInDepartment(department_id))
    }

    /// Asset forest of a department with expired assets left out.
    pub fn department_asset_tree(
        &self,
        actor: &ActorClaims,
        department_id: i64,
    ) -> Result<Vec<TreeView>> {
        self.require_department_read(actor, department_id)?;
        let forest = self.store.build_forest(TreeKind::Asset, department_id)?;
        Ok(forest.into_iter().flat_map(TreeView::into_active).collect())
    }

    pub fn held_assets(&self, actor: &ActorClaims, user_id: i64) -> Result<Vec<Asset>> {
        self.require_user_read(actor, user_id)?;
        self.store.list_assets(AssetFilter::Owner(user_id))
    }

    pub fn maintained_assets(&self, actor: &ActorClaims, user_id: i64) -> Result<Vec<Asset>> {
        self.require_user_read(actor, user_id)?;
        self.store.list_assets(AssetFilter::Maintainer(user_id))
    }

    pub fn modify_asset(&self, actor: &ActorClaims, id: i64, update: &AssetUpdate) -> Result<Asset> {
        let update = validate_asset_update(update)?;
        let asset = self.load_asset(id)?;
        self.require_department(actor, asset.department_id, Operation::Write)?;
        self.store.update_asset(id, &update)
    }

    pub fn reparent_asset(&self, actor: &ActorClaims, id: i64, parent_id: Option<i64>) -> Result<Asset> {
        let asset = self.load_asset(id)?;
        self.require_department(actor, asset.department_id, Operation::Write)?;
        self.store.reparent(TreeKind::Asset, id, parent_id)?;
        self.load_asset(id)
    }

    pub fn delete_asset(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        self.lifecycle.delete(actor, id)
    }

    // Statistics

    /// Snapshots the asset value of every department. System super only.
    pub fn record_asset_stats(&self, actor: &ActorClaims) -> Result<usize> {
        permission::require(actor, &TargetScope::system(), Operation::Admin)?;
        let recorded = self.store.record_asset_stats()?;
        tracing::info!(departments = recorded, "asset stats recorded");
        Ok(recorded)
    }

    pub fn department_stats(&self, actor: &ActorClaims, department_id: i64) -> Result<Vec<AssetStat>> {
        self.require_department_read(actor, department_id)?;
        self.store.list_asset_stats(department_id)
    }

    fn require_user_read(&self, actor: &ActorClaims, user_id: i64) -> Result<()> {
        let target = self.scopes.user_scope(user_id)?.as_target();
        permission::require(actor, &target, Operation::Read)
    }

    fn load_class(&self, id: i64) -> Result<AssetClass> {
        self.store
            .get_asset_class(id)?
            .ok_or(Error::AssetClassNotFound)
    }

    fn load_asset(&self, id: i64) -> Result<Asset> {
        self.store.get_asset(id)?.ok_or(Error::AssetNotFound)
    }
}
