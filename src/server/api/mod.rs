mod assets;
mod departments;
mod entities;
mod tasks;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Session routes
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        // User routes
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/me", get(users::me))
        .route("/users/{id}", get(users::get_user).delete(users::delete_user))
        .route("/users/{id}/roles", put(users::set_roles))
        .route("/users/{id}/password", put(users::change_password))
        .route("/users/{id}/ban", put(users::set_banned))
        .route("/users/{id}/entity", put(users::change_entity))
        .route("/users/{id}/department", put(users::change_department))
        .route("/users/{id}/assets", get(users::held_assets))
        .route("/users/{id}/maintained", get(users::maintained_assets))
        .route("/users/{id}/tasks", get(users::user_tasks))
        // Entity routes
        .route(
            "/entities",
            get(entities::list_entities).post(entities::create_entity),
        )
        .route(
            "/entities/{id}",
            get(entities::get_entity).delete(entities::delete_entity),
        )
        .route("/entities/{id}/users", get(entities::entity_users))
        .route("/entities/{id}/departments", get(entities::entity_departments))
        .route("/entities/{id}/departments/tree", get(entities::department_tree))
        .route("/entities/{id}/tasks", get(entities::entity_tasks))
        // Department routes
        .route("/departments", post(departments::create_department))
        .route(
            "/departments/{id}",
            get(departments::get_department).delete(departments::delete_department),
        )
        .route("/departments/{id}/parent", put(departments::reparent_department))
        .route("/departments/{id}/entity", put(departments::rescope_department))
        .route(
            "/departments/{id}/classes",
            get(departments::class_tree).post(departments::create_class),
        )
        .route(
            "/departments/{id}/assets",
            get(departments::list_assets).post(departments::create_assets),
        )
        .route("/departments/{id}/assets/tree", get(departments::asset_tree))
        .route("/departments/{id}/stats", get(departments::stats))
        // Task routes
        .route(
            "/departments/{id}/tasks",
            get(tasks::list_department_tasks),
        )
        .route("/tasks", post(tasks::create_task))
        .route("/departments/{id}/tasks/{task_id}", get(tasks::get_task))
        .route(
            "/departments/{id}/tasks/{task_id}/start",
            post(tasks::start_task),
        )
        .route(
            "/departments/{id}/tasks/{task_id}/state",
            put(tasks::modify_task_state),
        )
        // Asset class routes
        .route(
            "/classes/{id}",
            get(assets::get_class).delete(assets::delete_class),
        )
        .route("/classes/{id}/name", put(assets::rename_class))
        .route("/classes/{id}/parent", put(assets::reparent_class))
        // Asset routes
        .route(
            "/assets/{id}",
            get(assets::get_asset)
                .patch(assets::modify_asset)
                .delete(assets::delete_asset),
        )
        .route("/assets/{id}/parent", put(assets::reparent_asset))
        .route("/assets/acquire", post(assets::acquire))
        .route("/assets/cancel", post(assets::cancel))
        .route("/assets/maintain", post(assets::maintain))
        .route("/assets/expire", post(assets::expire))
        .route("/assets/transfer", post(assets::transfer))
        .route("/stats/record", post(assets::record_stats))
}
