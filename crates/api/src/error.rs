use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use libris_core::error::{CoreError, ErrorKind, FieldError};
use serde::Serialize;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `libris_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

/// JSON error body: `{ "status": "error", "message", "code", ... }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    /// HTTP status code, repeated in the body.
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, kind, errors) = match self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => {
                let (status, message) = classify_sqlx_error(&err);
                (status, message, None, Vec::new())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None, Vec::new()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_MESSAGE.to_string(),
                    None,
                    Vec::new(),
                )
            }
        };

        let body = ErrorBody {
            status: "error",
            message,
            code: status.as_u16(),
            kind,
            errors,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn classify_core_error(core: CoreError) -> (StatusCode, String, Option<ErrorKind>, Vec<FieldError>) {
    let kind = core.kind();
    match core {
        CoreError::NotFound { .. } => (StatusCode::NOT_FOUND, core.to_string(), Some(kind), Vec::new()),
        CoreError::Validation(ref errors) => {
            let errors = errors.clone();
            (StatusCode::BAD_REQUEST, core.to_string(), Some(kind), errors)
        }
        CoreError::ForeignKeyNotFound { .. }
        | CoreError::DuplicateEntity { .. }
        | CoreError::CapacityExceeded { .. } => {
            (StatusCode::BAD_REQUEST, core.to_string(), Some(kind), Vec::new())
        }
        CoreError::Persistence(msg) => {
            tracing::error!(error = %msg, "Persistence failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
                Some(kind),
                Vec::new(),
            )
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
                None,
                Vec::new(),
            )
        }
    }
}

/// Classify a sqlx error into an HTTP status and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::BAD_REQUEST,
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}
