use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireActor;
use crate::server::AppState;
use crate::server::dto::{
    BanRequest, ChangePasswordRequest, CreateUserRequest, CreateUserResponse, DepartmentRequest,
    EntityRequest, ListUsersParams, LoginRequest, LoginResponse, RolesRequest,
};
use crate::server::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::response::{ApiError, ApiResponse, page_limit, paginate};
use crate::service::{NewUserRequest, PasswordChange};
use crate::store::UserFilter;

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let login = state.services.login(&req.username, &req.password)?;

    Ok(Json(ApiResponse::success(LoginResponse {
        token: login.token,
        expires_at: login.expires_at,
        user: login.user,
    })))
}

pub async fn logout(actor: RequireActor, State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.services.logout(&actor.token_id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn me(actor: RequireActor, State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.get_user(&actor.claims, actor.claims.user_id)?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn create_user(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, password) = state.services.create_user(
        &actor.claims,
        NewUserRequest {
            username: req.username,
            password: req.password,
            entity_id: req.entity_id,
            department_id: req.department_id,
            roles: req.roles.into(),
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CreateUserResponse { user, password })),
    ))
}

pub async fn list_users(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListUsersParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = match (params.department_id, params.entity_id) {
        (Some(department_id), _) => UserFilter::Department(department_id),
        (None, Some(entity_id)) => UserFilter::Entity(entity_id),
        (None, None) => UserFilter::default_for(&actor.claims),
    };
    let limit = page_limit(params.limit);

    let users = state.services.list_users(
        &actor.claims,
        filter,
        params.cursor.unwrap_or(0),
        limit + 1,
    )?;

    Ok(Json(ApiResponse::success(paginate(
        users,
        limit as usize,
        |u| u.id,
    ))))
}

pub async fn get_user(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.get_user(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn delete_user(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.delete_user(&actor.claims, id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn set_roles(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RolesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.services.set_roles(&actor.claims, id, req.into())?;
    Ok(Json(ApiResponse::success(user)))
}

pub async fn change_password(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.change_password(
        &actor.claims,
        id,
        PasswordChange {
            old_password: req.old_password.as_deref(),
            new_password: &req.new_password,
        },
    )?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn set_banned(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<BanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.set_banned(&actor.claims, id, req.banned)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn change_entity(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<EntityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .change_user_entity(&actor.claims, id, req.entity_id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn change_department(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<DepartmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .change_user_department(&actor.claims, id, req.department_id)?;
    Ok(Json(ApiResponse::empty()))
}

pub async fn held_assets(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = state.services.held_assets(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn maintained_assets(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let assets = state.services.maintained_assets(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(assets)))
}

pub async fn user_tasks(
    actor: RequireActor,
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.services.tasks().list_for_user(&actor.claims, id)?;
    Ok(Json(ApiResponse::success(tasks)))
}
