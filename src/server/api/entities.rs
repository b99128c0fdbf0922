use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireActor;
use crate::server::AppState;
use crate::server::dto::{NameRequest, PaginationParams};
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, page_limit, paginate};
use crate::store::UserFilter;

pub async fn create_entity(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<NameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let entity = state.services.create_entity(&actor.claims, &req.name)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(entity))))
}

pub async fn list_entities(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let entities = state.services.list_entities(&actor.claims)?;
    Ok(Json(ApiResponse::success(entities)))
}

pub async fn get_entity(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let entity = state.services.get_entity(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(entity)))
}

pub async fn delete_entity(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.delete_entity(&actor.claims, id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn entity_users(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = page_limit(params.limit);
    let users = state.services.list_users(
        &actor.claims,
        UserFilter::Entity(id),
        params.cursor.unwrap_or(0),
        limit + 1,
    )?;
    Ok(Json(ApiResponse::success(paginate(
        users,
        limit as usize,
        |u| u.id,
    ))))
}

pub async fn entity_departments(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let departments = state.services.list_departments(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(departments)))
}

pub async fn department_tree(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state.services.department_tree(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(tree)))
}

pub async fn entity_tasks(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.services.tasks().list_for_entity(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(tasks)))
}
