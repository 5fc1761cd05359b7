#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderValue, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use libris_core::catalog::CatalogConfig;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use libris_api::config::ServerConfig;
use libris_api::router::build_app_router;
use libris_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        catalog: CatalogConfig::default(),
    }
}

/// Build the full application router, middleware included, on `pool`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(AppState::new(pool, test_config()))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: Router, uri: &str, body: Value) -> Response {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// POST `body` to `uri`, assert 201 and return the new row's id.
pub async fn create(pool: &PgPool, uri: &str, body: Value) -> i64 {
    let response = post_json(build_test_app(pool.clone()), uri, body).await;
    let status = response.status();
    let json = body_json(response).await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "{json}");
    json["data"]["id"].as_i64().unwrap()
}

pub fn library_body() -> Value {
    serde_json::json!({
        "name": "  Central   Library ",
        "address": {"street": "1 Main St", "district": "Pune", "state": "MH", "pin": "411001"},
        "contact_email": "Desk@Central.org",
        "phone": "+1 650-253-0000",
    })
}

pub fn member_body(n: u32) -> Value {
    serde_json::json!({
        "first_name": "ada",
        "last_name": "lovelace",
        "email": format!("ada{n}@example.com"),
        "phone": format!("+1650253{n:04}"),
        "member_type": "student",
    })
}

pub fn book_body(library_id: i64, total: i32) -> Value {
    serde_json::json!({
        "title": "Refactoring",
        "isbn": "978-0-13-468599-1",
        "publication_date": "2018-11-20",
        "total_copies": total,
        "library_id": library_id,
    })
}
