//! HTTP surface tests driven through the router without binding a socket.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use assetry::server::{AppState, create_router};
use assetry::store::{SqliteStore, Store};

struct TestApp {
    router: Router,
    state: Arc<AppState>,
}

impl TestApp {
    fn new() -> Self {
        let store = SqliteStore::open_in_memory().expect("open store");
        store.initialize().expect("initialize");
        let store: Arc<dyn Store> = Arc::new(store);

        let state = Arc::new(AppState::new(store, None));
        state
            .services
            .bootstrap_admin("root", Some("rootpass".to_string()))
            .expect("bootstrap");

        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/login",
                None,
                Some(json!({"username": username, "password": password})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new();
    let token = app.login("root", "rootpass").await;
    assert!(token.starts_with("assetry_"));

    let (status, body) = app.call(Method::GET, "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["info"], "success");
    assert_eq!(body["data"]["username"], "root");
    assert_eq!(body["data"]["roles"], 4);
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({"username": "root", "password": "nope-nope"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 1);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_missing_token() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/api/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 5);

    let (status, _) = app
        .call(Method::GET, "/api/v1/users/me", Some("assetry_bogus"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = TestApp::new();
    let token = app.login("root", "rootpass").await;

    let (status, body) = app.call(Method::POST, "/api/v1/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);

    let (status, _) = app.call(Method::GET, "/api/v1/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_org_setup_and_scope_denial() {
    let app = TestApp::new();
    let root = app.login("root", "rootpass").await;

    let (status, body) = app
        .call(Method::POST, "/api/v1/entities", Some(&root), Some(json!({"name": "acme"})))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let entity_id = body["data"]["id"].as_i64().unwrap();

    let mut departments = Vec::new();
    for name in ["A", "B"] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/departments",
                Some(&root),
                Some(json!({"entity_id": entity_id, "name": name})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        departments.push(body["data"]["id"].as_i64().unwrap());
    }

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/users",
            Some(&root),
            Some(json!({
                "username": "clerk",
                "department_id": departments[0],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let password = body["data"]["password"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["entity_id"], entity_id);

    let clerk = app.login("clerk", &password).await;
    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/departments/{}/stats", departments[1]),
            Some(&clerk),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/departments/{}/assets", departments[0]),
            Some(&clerk),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_input() {
    let app = TestApp::new();
    let root = app.login("root", "rootpass").await;

    let (status, body) = app
        .call(Method::GET, "/api/v1/users/not-a-number", Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 8);

    let (status, body) = app
        .call(Method::POST, "/api/v1/entities", Some(&root), Some(json!({"nam": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], -1);

    let (status, body) = app
        .call(Method::POST, "/api/v1/assets/acquire", Some(&root), Some(json!({"asset_ids": []})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 35);
}

#[tokio::test]
async fn test_state_shared_with_router() {
    let app = TestApp::new();
    let users = app
        .state
        .store
        .list_users(assetry::store::UserFilter::All, 0, 10)
        .unwrap();
    assert_eq!(users.len(), 1);
}
