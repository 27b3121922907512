//! Test utilities shared by the integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use taskboard_backend_lib::{
    config::Settings, router::create_router, storage::FlatFileStorage, AppState,
};
use tempfile::TempDir;
use tower::ServiceExt;

/// Settings that keep tests fast: cheap hashing, no practical rate limit
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.password_requirements.hash_cost = 4;
    settings.rate_limit.max_requests = 100_000;
    settings.realtime.connection_buffer = 16;
    settings
}

/// Sets up a test environment backed by a temporary directory.
///
/// Keep the returned `TempDir` in scope for the duration of the test.
pub fn setup_test_env() -> (Arc<AppState<FlatFileStorage>>, Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let storage = FlatFileStorage::new(temp_dir.path()).unwrap();
    let state = Arc::new(AppState::new(storage, &test_settings()));
    let app = create_router(Arc::clone(&state));
    (state, app, temp_dir)
}

/// Send a request through the router, returning the status and the JSON body
/// (`Value::Null` when the body is not JSON)
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Register a user through the API, returning `(token, user_id)`
pub async fn register(app: &Router, name: &str, email: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(serde_json::json!({
            "name": name,
            "email": email,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// Create a project through the API, returning its id
pub async fn create_project(app: &Router, token: &str, title: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/projects",
        Some(token),
        Some(serde_json::json!({ "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create project failed: {body}");
    body["id"].as_str().unwrap().to_string()
}

/// Create a task through the API, returning the task JSON
pub async fn create_task(app: &Router, token: &str, project_id: &str, title: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/tasks",
        Some(token),
        Some(serde_json::json!({ "projectId": project_id, "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create task failed: {body}");
    body
}
