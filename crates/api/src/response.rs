//! Shared response envelope types for API handlers.
//!
//! Successful responses use a `{ "data": ... }` envelope; errors are built
//! by [`crate::error::AppError`].

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: rows }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
