//! Tests for `AppError` -> HTTP response mapping. No server needed: these
//! call `IntoResponse` directly.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use libris_api::error::AppError;
use libris_core::error::{CoreError, ErrorCode, FieldError};

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Book",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], "error");
    assert_eq!(json["code"], 404);
    assert_eq!(json["message"], "Book with id 42 not found");
}

#[tokio::test]
async fn validation_error_lists_fields() {
    let err = AppError::Core(CoreError::Validation(vec![
        FieldError::new("phone", ErrorCode::InvalidPhone, "not a valid phone number").with_raw("12"),
        FieldError::record("available_copies", "available_copies (5) exceeds total_copies (3)"),
    ]));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
    assert_eq!(json["kind"], "invalid_field");
    assert_eq!(json["errors"][0]["field"], "phone");
    assert_eq!(json["errors"][0]["code"], "invalid_phone");
    assert_eq!(json["errors"][0]["raw_value"], "12");
    assert_eq!(json["errors"][1]["code"], "invalid_record");
}

#[tokio::test]
async fn rule_violations_are_bad_requests() {
    let duplicate = AppError::Core(CoreError::duplicate(
        "Review",
        &["member_id", "book_id"],
        "member 7 already reviewed book 3",
    ));
    let (status, json) = error_to_response(duplicate).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "duplicate_entity");
    assert!(json.get("errors").is_none());

    let capacity = AppError::Core(CoreError::capacity("member_id", "borrowing limit reached"));
    let (status, json) = error_to_response(capacity).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "capacity_exceeded");

    let missing = AppError::Core(CoreError::ForeignKeyNotFound {
        entity: "Borrowing",
        field: "member_id".into(),
        target: "Member",
        value: "9".into(),
    });
    let (status, json) = error_to_response(missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "foreign_key_not_found");
}

#[tokio::test]
async fn persistence_failure_returns_500_and_sanitizes_message() {
    let err = AppError::Core(CoreError::Persistence("password authentication failed".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], 500);
    assert_eq!(json["message"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_returns_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["message"], "Resource not found");
}

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) =
        error_to_response(AppError::BadRequest("request body must be a JSON object".into())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "request body must be a JSON object");
}
