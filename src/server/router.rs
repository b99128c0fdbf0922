use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};
use chrono::Duration;

use super::api::api_router;
use crate::service::Services;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub services: Services,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, token_ttl: Option<Duration>) -> Self {
        Self {
            services: Services::new(store.clone(), token_ttl),
            store,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = uri.path(),
        status = status.as_u16(),
        latency_ms = latency.as_millis() as u64,
        "request"
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
