use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::RequireActor;
use crate::server::AppState;
use crate::server::dto::{
    AssetIdsRequest, CountResponse, MaintainRequest, NameRequest, ParentRequest, TransferRequest,
};
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::response::{ApiError, ApiResponse};
use crate::service::validation::validate_ids;
use crate::types::AssetUpdate;

// Asset classes

pub async fn get_class(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let class = state.services.get_asset_class(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(class)))
}

pub async fn rename_class(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<NameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let class = state
        .services
        .rename_asset_class(&actor.claims, id, &req.name)?;
    Ok(Json(ApiResponse::success(class)))
}

pub async fn reparent_class(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ParentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .reparent_asset_class(&actor.claims, id, req.parent_id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn delete_class(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.delete_asset_class(&actor.claims, id)?;
    Ok(Json(ApiResponse::empty()))
}

// Assets

pub async fn get_asset(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state.services.get_asset(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(asset)))
}

pub async fn modify_asset(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<AssetUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state.services.modify_asset(&actor.claims, id, &update)?;
    Ok(Json(ApiResponse::success(asset)))
}

pub async fn reparent_asset(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ParentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let asset = state
        .services
        .reparent_asset(&actor.claims, id, req.parent_id)?;
    Ok(Json(ApiResponse::success(asset)))
}

pub async fn delete_asset(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.delete_asset(&actor.claims, id)?;
    Ok(Json(ApiResponse::empty()))
}

// Lifecycle

pub async fn acquire(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssetIdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ids(&req.asset_ids)?;
    let assets = state
        .services
        .lifecycle()
        .acquire(&actor.claims, &req.asset_ids)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn cancel(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssetIdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ids(&req.asset_ids)?;
    let assets = state
        .services
        .lifecycle()
        .cancel(&actor.claims, &req.asset_ids)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn maintain(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<MaintainRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ids(&req.asset_ids)?;
    let assets = state.services.lifecycle().assign_maintainer(
        &actor.claims,
        &req.asset_ids,
        req.maintainer_id,
    )?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn expire(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AssetIdsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_ids(&req.asset_ids)?;
    let assets = state
        .services
        .lifecycle()
        .expire(&actor.claims, &req.asset_ids)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn transfer(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = state.services.lifecycle().transfer(
        &actor.claims,
        &req.asset_ids,
        req.user_id,
        req.department_id,
    )?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn record_stats(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.services.record_asset_stats(&actor.claims)?;
    Ok(Json(ApiResponse::success(CountResponse { count })))
}
