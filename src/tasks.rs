//! Tracking of deferred bulk operations.
//!
//! Tasks move `pending -> running -> {success, failed}`. A terminal task
//! never changes again, so a duplicate completion callback is rejected
//! instead of overwriting the first result.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::permission::{self, Operation, TargetScope};
use crate::scope::ScopeDirectory;
use crate::store::{Store, TaskFilter};
use crate::types::{ActorClaims, AsyncTask, NewTask, TaskState, TaskType};

/// Parses the outcome accepted by [`AsyncTaskTracker::modify_state`].
pub fn parse_outcome(input: &str) -> Result<TaskState> {
    match input {
        "success" => Ok(TaskState::Success),
        "failed" => Ok(TaskState::Failed),
        other => Err(Error::InvalidParam(format!(
            "task state must be 'success' or 'failed', got '{other}'"
        ))),
    }
}

/// Checks the edge from the task's current state to `to`.
pub fn advance(task: &AsyncTask, to: TaskState) -> Result<TaskState> {
    use TaskState::*;

    if task.state.is_terminal() {
        return Err(Error::TaskFinished(task.id));
    }
    match (task.state, to) {
        (Pending, Running) | (Pending | Running, Success | Failed) => Ok(to),
        (from, to) => Err(Error::InvalidParam(format!(
            "task cannot move from {} to {}",
            from.as_str(),
            to.as_str()
        ))),
    }
}

/// Completion details reported by the worker.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub message: Option<String>,
    pub download_link: Option<String>,
}

pub struct AsyncTaskTracker {
    store: Arc<dyn Store>,
    scopes: ScopeDirectory,
}

impl AsyncTaskTracker {
    pub fn new(store: Arc<dyn Store>, scopes: ScopeDirectory) -> Self {
        Self { store, scopes }
    }

    /// Records a new pending task scoped to the actor's department.
    pub fn create(
        &self,
        actor: &ActorClaims,
        task_type: TaskType,
        object_key: Option<String>,
        download_link: Option<String>,
    ) -> Result<AsyncTask> {
        let department_id = actor.department_id.ok_or(Error::UserNotInDepartment)?;
        let entity_id = self.scopes.department_entity(department_id)?;

        let task = self.store.create_task(&NewTask {
            task_type,
            issuer_id: actor.user_id,
            department_id,
            entity_id,
            download_link,
            object_key,
        })?;
        tracing::info!(
            task_id = task.id,
            task_type = task_type.as_str(),
            department_id,
            "task created"
        );
        Ok(task)
    }

    pub fn get(&self, actor: &ActorClaims, department_id: i64, id: i64) -> Result<AsyncTask> {
        let task = self.load(department_id, id)?;
        if actor.department_id != Some(task.department_id) {
            permission::require(actor, &task_target(&task), Operation::Read)?;
        }
        Ok(task)
    }

    /// Moves a pending task to running.
    pub fn start(&self, actor: &ActorClaims, department_id: i64, id: i64) -> Result<AsyncTask> {
        self.transition(actor, department_id, id, TaskState::Running, Completion::default())
    }

    /// Finishes a task. Only `success` and `failed` are accepted.
    pub fn modify_state(
        &self,
        actor: &ActorClaims,
        department_id: i64,
        id: i64,
        state: &str,
        completion: Completion,
    ) -> Result<AsyncTask> {
        let to = parse_outcome(state)?;
        self.transition(actor, department_id, id, to, completion)
    }

    /// Tasks issued by one user.
    pub fn list_for_user(&self, actor: &ActorClaims, user_id: i64) -> Result<Vec<AsyncTask>> {
        let target = self.scopes.user_scope(user_id)?.as_target();
        permission::require(actor, &target, Operation::Read)?;
        self.store.list_tasks(TaskFilter::Issuer(user_id))
    }

    /// Tasks issued from one department, whatever the caller's tier.
    /// Members of the department may always list them.
    pub fn list_for_department(
        &self,
        actor: &ActorClaims,
        department_id: i64,
    ) -> Result<Vec<AsyncTask>> {
        let target = self.scopes.department_target(department_id)?;
        if actor.department_id != Some(department_id) {
            permission::require(actor, &target, Operation::Read)?;
        }
        self.store.list_tasks(TaskFilter::Department(department_id))
    }

    /// Tasks of every department in an entity.
    pub fn list_for_entity(&self, actor: &ActorClaims, entity_id: i64) -> Result<Vec<AsyncTask>> {
        self.store
            .get_entity(entity_id)?
            .ok_or(Error::EntityNotFound)?;
        permission::require(actor, &TargetScope::entity(entity_id), Operation::Read)?;
        self.store.list_tasks(TaskFilter::Entity(entity_id))
    }

    fn load(&self, department_id: i64, id: i64) -> Result<AsyncTask> {
        let task = self.store.get_task(id)?.ok_or(Error::TaskNotFound)?;
        if task.department_id != department_id {
            return Err(Error::TaskNotInDepartment);
        }
        Ok(task)
    }

    fn transition(
        &self,
        actor: &ActorClaims,
        department_id: i64,
        id: i64,
        to: TaskState,
        completion: Completion,
    ) -> Result<AsyncTask> {
        let task = self.load(department_id, id)?;
        permission::require(actor, &task_target(&task), Operation::Write)?;

        let mut completion = Some(completion);
        let task = self
            .store
            .update_task(id, &mut |task| {
                if task.department_id != department_id {
                    return Err(Error::TaskNotInDepartment);
                }
                task.state = advance(task, to)?;
                if let Some(done) = completion.take() {
                    if let Some(message) = done.message {
                        task.message = message;
                    }
                    if done.download_link.is_some() {
                        task.download_link = done.download_link;
                    }
                }
                Ok(())
            })
            .inspect_err(|e| tracing::debug!(task_id = id, error = %e, "task transition rejected"))?;

        tracing::info!(task_id = id, state = task.state.as_str(), "task state changed");
        Ok(task)
    }
}

fn task_target(task: &AsyncTask) -> TargetScope {
    TargetScope {
        entity_id: Some(task.entity_id),
        department_id: Some(task.department_id),
        owner_id: Some(task.issuer_id),
    }
}
