use super::Services;
use super::validation::validate_name;
use crate::error::{Error, Result};
use crate::permission::{self, Operation, TargetScope};
use crate::types::{ActorClaims, Entity};

impl Services {
    pub fn create_entity(&self, actor: &ActorClaims, name: &str) -> Result<Entity> {
        let name = validate_name(name, Error::EntityNameEmpty)?;
        permission::require(actor, &TargetScope::system(), Operation::Admin)?;

        let entity = self.store.create_entity(&name)?;
        tracing::info!(actor = actor.user_id, entity_id = entity.id, "entity created");
        Ok(entity)
    }

    /// Every entity for system supers, otherwise the actor's own.
    pub fn list_entities(&self, actor: &ActorClaims) -> Result<Vec<Entity>> {
        if permission::require(actor, &TargetScope::system(), Operation::Read).is_ok() {
            return self.store.list_entities();
        }
        match actor.entity_id {
            Some(entity_id) => Ok(self.store.get_entity(entity_id)?.into_iter().collect()),
            None => Ok(Vec::new()),
        }
    }

    pub fn get_entity(&self, actor: &ActorClaims, id: i64) -> Result<Entity> {
        let entity = self.store.get_entity(id)?.ok_or(Error::EntityNotFound)?;
        if actor.entity_id != Some(id) {
            permission::require(actor, &TargetScope::entity(id), Operation::Read)?;
        }
        Ok(entity)
    }

    pub fn delete_entity(&self, actor: &ActorClaims, id: i64) -> Result<()> {
        permission::require(actor, &TargetScope::system(), Operation::Admin)?;
        self.store.delete_entity(id)
    }
}
