use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireActor;
use crate::server::AppState;
use crate::server::dto::{CreateTaskRequest, ModifyTaskStateRequest};
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::response::{ApiError, ApiResponse};
use crate::tasks::Completion;

pub async fn create_task(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.services.tasks().create(
        &actor.claims,
        req.task_type,
        req.object_key,
        req.download_link,
    )?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(task))))
}

pub async fn list_department_tasks(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(department_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state
        .services
        .tasks()
        .list_for_department(&actor.claims, department_id)?;
    Ok(Json(ApiResponse::success(tasks)))
}

pub async fn get_task(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath((department_id, id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .services
        .tasks()
        .get(&actor.claims, department_id, id)?;
    Ok(Json(ApiResponse::success(task)))
}

pub async fn start_task(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath((department_id, id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .services
        .tasks()
        .start(&actor.claims, department_id, id)?;
    Ok(Json(ApiResponse::success(task)))
}

pub async fn modify_task_state(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath((department_id, id)): ApiPath<(i64, i64)>,
    ApiJson(req): ApiJson<ModifyTaskStateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.services.tasks().modify_state(
        &actor.claims,
        department_id,
        id,
        &req.state,
        Completion {
            message: req.message,
            download_link: req.download_link,
        },
    )?;
    Ok(Json(ApiResponse::success(task)))
}
