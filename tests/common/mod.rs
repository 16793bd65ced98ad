#![allow(dead_code)]

use std::time::Duration;

use assert_cmd::Command;
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const TOKEN: &str = "secret-token";

pub fn taskdeck_bin() -> Command {
    #[allow(deprecated)]
    {
        Command::cargo_bin("taskdeck").expect("taskdeck test binary should build")
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Unauthenticated."})),
    )
        .into_response()
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != "hunter2" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "message": "The given data was invalid.",
                "errors": {"password": ["The password is incorrect."]}
            })),
        )
            .into_response();
    }
    Json(json!({
        "success": true,
        "data": {"token": TOKEN, "user": {"id": 7, "name": "Ada", "role": "admin"}}
    }))
    .into_response()
}

async fn users(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthenticated();
    }
    Json(json!([
        {"id": 7, "name": "Ada", "online": true},
        {"id": "8", "username": "Grace"}
    ]))
    .into_response()
}

/// Bare array, one record using the legacy field names.
async fn projects() -> Json<Value> {
    Json(json!([
        {"id": 1, "title": "Website", "owner_id": 7, "status": "active"},
        {"id": 2, "name": "Mobile", "owner_id": "8", "status": "completed"}
    ]))
}

/// Paginated envelope.
async fn tasks() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "data": [
                {"id": 10, "title": "Design", "status": "done", "project_id": 1, "priority": "high"},
                {"id": 11, "title": "Build", "status": "in_progress", "project_id": 1, "priority": "critical"},
                {"id": 12, "title": "Ship", "status": "todo", "project_id": 2}
            ],
            "current_page": 1,
            "last_page": 1,
            "per_page": 100,
            "total": 3
        }
    }))
}

async fn update_task(Path(_id): Path<u64>) -> Json<Value> {
    Json(json!({
        "success": false,
        "message": "Validation failed",
        "errors": {"title": ["The title field is required."]}
    }))
}

async fn delete_task(Path(_id): Path<u64>) -> Response {
    (StatusCode::FORBIDDEN, Json(json!({"message": "Forbidden"}))).into_response()
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!([]))
}

/// Serve a small tracker API on an ephemeral port; returns its base URL.
pub async fn spawn_tracker() -> String {
    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/users", get(users))
        .route("/api/projects", get(projects))
        .route("/api/tasks", get(tasks))
        .route("/api/tasks/:id", put(update_task).delete(delete_task))
        .route("/api/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}/api", addr)
}
