//! Request-level orchestration.
//!
//! Every operation authorizes the actor first and only then touches the
//! store. Rules about scope and state live in the core modules; this layer
//! picks the right target scope for each request and validates input before
//! any store access.

mod assets;
mod departments;
mod entities;
mod users;
pub mod validation;

use std::sync::Arc;

use chrono::Duration;

use crate::error::Result;
use crate::lifecycle::AssetLifecycle;
use crate::permission::{self, Operation, TargetScope};
use crate::scope::ScopeDirectory;
use crate::store::Store;
use crate::tasks::AsyncTaskTracker;
use crate::types::ActorClaims;

pub use assets::AssetCreation;
pub use users::{Login, NewUserRequest, PasswordChange};

/// Service objects built once at startup and shared by every handler.
pub struct Services {
    store: Arc<dyn Store>,
    scopes: ScopeDirectory,
    lifecycle: AssetLifecycle,
    tasks: AsyncTaskTracker,
    token_ttl: Option<Duration>,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, token_ttl: Option<Duration>) -> Self {
        let scopes = ScopeDirectory::new(store.clone());
        Self {
            lifecycle: AssetLifecycle::new(store.clone(), scopes.clone()),
            tasks: AsyncTaskTracker::new(store.clone(), scopes.clone()),
            scopes,
            store,
            token_ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn scopes(&self) -> &ScopeDirectory {
        &self.scopes
    }

    pub fn lifecycle(&self) -> &AssetLifecycle {
        &self.lifecycle
    }

    pub fn tasks(&self) -> &AsyncTaskTracker {
        &self.tasks
    }

    /// Members may browse their own department; everyone else needs read
    /// authority over it.
    fn require_department_read(&self, actor: &ActorClaims, department_id: i64) -> Result<TargetScope> {
        let target = self.scopes.department_target(department_id)?;
        if actor.department_id == Some(department_id) {
            return Ok(target);
        }
        permission::require(actor, &target, Operation::Read)?;
        Ok(target)
    }

    fn require_department(
        &self,
        actor: &ActorClaims,
        department_id: i64,
        op: Operation,
    ) -> Result<TargetScope> {
        let target = self.scopes.department_target(department_id)?;
        permission::require(actor, &target, op)?;
        Ok(target)
    }
}
