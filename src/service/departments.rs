use super::Services;
use super::validation::validate_name;
use crate::error::{Error, Result};
use crate::permission::{self, Operation, TargetScope};
use crate::types::{ActorClaims, Department, TreeKind, TreeView};

impl Services {
    /// Creates a department, optionally under a parent of the same entity.
    pub fn create_department(
        &self,
        actor: &ActorClaims,
        entity_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Department> {
        let name = validate_name(name, Error::DepartmentNameEmpty)?;
        self.store
            .get_entity(entity_id)?
            .ok_or(Error::EntityNotFound)?;
        permission::require(actor, &TargetScope::entity(entity_id), Operation::Admin)?;

        let department = self.store.create_department(&name, entity_id, parent_id)?;
        tracing::info!(
            actor = actor.user_id,
            department_id = department.id,
            entity_id,
            "department created"
        );
        Ok(department)
    }

    pub fn get_department(&self, actor: &ActorClaims, id: i64) -> Result<Department> {
        let department = self
            .store
            .get_department(id)?
            .ok_or(Error::DepartmentNotFound)?;
        if actor.entity_id != Some(department.entity_id) {
            self.require_department_read(actor, id)?;
        }
        Ok(department)
    }

    pub fn list_departments(&self, actor: &ActorClaims, entity_id: i64) -> Result<Vec<Department>> {
        self.require_entity_read(actor, entity_id)?;
        self.store.list_departments(entity_id)
    }

    pub fn department_tree(&self, actor: &ActorClaims, entity_id: i64) -> Result<Vec<TreeView>> {
        self.require_entity_read(actor, entity_id)?;
        self.store.build_forest(TreeKind::Department, entity_id)
    }

    pub fn reparent_department(
        &self,
        actor: &ActorClaims,
        id: i64,
        parent_id: Option<i64>,
    ) -> Result<()> {
        self.require_department_admin(actor, id)?;
        self.store.reparent(TreeKind::Department, id, parent_id)
    }

    pub fn delete_department(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        self.require_department_admin(actor, id)?;
        self.store.delete_department(id)
    }

    /// Moves a department subtree and its users to another entity. System
    /// super only.
    pub fn rescope_department(
        &self,
        actor: &ActorClaims,
        id: i64,
        entity_id: i64,
    ) -> Result<Vec<i64>> {
        permission::require(actor, &TargetScope::system(), Operation::Admin)?;
        let moved = self.store.rescope_department(id, entity_id)?;
        tracing::info!(
            actor = actor.user_id,
            department_id = id,
            entity_id,
            moved = moved.len(),
            "department rescoped"
        );
        Ok(moved)
    }

    /// Members of an entity may browse its departments.
    fn require_entity_read(&self, actor: &ActorClaims, entity_id: i64) -> Result<()> {
        self.store
            .get_entity(entity_id)?
            .ok_or(Error::EntityNotFound)?;
        if actor.entity_id == Some(entity_id) {
            return Ok(());
        }
        permission::require(actor, &TargetScope::entity(entity_id), Operation::Read)
    }

    /// Department structure is managed at entity level.
    fn require_department_admin(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        let entity_id = self.scopes.department_entity(id)?;
        permission::require(actor, &TargetScope::entity(entity_id), Operation::Admin)
    }
}
