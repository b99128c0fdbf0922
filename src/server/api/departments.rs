use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireActor;
use crate::server::AppState;
use crate::server::dto::{
    CreateAssetsRequest, CreateClassRequest, CreateDepartmentRequest, EntityRequest, ParentRequest,
};
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::AssetCreation;

pub async fn create_department(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateDepartmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let department =
        state
            .services
            .create_department(&actor.claims, req.entity_id, &req.name, req.parent_id)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(department))))
}

pub async fn get_department(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let department = state.services.get_department(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(department)))
}

pub async fn delete_department(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.delete_department(&actor.claims, id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn reparent_department(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ParentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .reparent_department(&actor.claims, id, req.parent_id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn rescope_department(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<EntityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let moved = state
        .services
        .rescope_department(&actor.claims, id, req.entity_id)?;
    Ok(Json(ApiResponse::success(moved)))
}

pub async fn create_class(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateClassRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let class = state.services.create_asset_class(
        &actor.claims,
        id,
        &req.name,
        req.parent_id,
        &req.class_type,
    )?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(class))))
}

pub async fn class_tree(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state.services.asset_class_tree(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(tree)))
}

pub async fn create_assets(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<CreateAssetsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = state.services.create_assets(
        &actor.claims,
        &AssetCreation {
            department_id: id,
            parent_id: req.parent_id,
            assets: req.assets,
        },
    )?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(assets))))
}

pub async fn list_assets(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = state.services.list_department_assets(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn asset_tree(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state.services.department_asset_tree(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(tree)))
}

pub async fn stats(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.services.department_stats(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(stats)))
}
