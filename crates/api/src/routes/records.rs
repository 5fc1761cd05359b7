//! Route definitions for one entity collection.

use axum::routing::get;
use axum::{Extension, Router};
use libris_core::entity::EntityKind;

use crate::handlers::records;
use crate::state::AppState;

/// Routes mounted at `/{collection}` for `kind`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create
/// GET    /{id}    -> get_by_id
/// PUT    /{id}    -> update
/// PATCH  /{id}    -> partial_update
/// DELETE /{id}    -> delete
/// ```
pub fn router(kind: EntityKind) -> Router<AppState> {
    Router::new()
        .route("/", get(records::list).post(records::create))
        .route(
            "/{id}",
            get(records::get_by_id)
                .put(records::update)
                .patch(records::partial_update)
                .delete(records::delete),
        )
        .layer(Extension(kind))
}
