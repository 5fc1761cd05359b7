//! CRUD handlers shared by every entity collection.
//!
//! Each collection router injects its [`EntityKind`] as an extension.
//! Reads go straight to the repositories; writes run through the catalog
//! inside one transaction per request.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use libris_core::entity::EntityKind;
use libris_core::error::CoreError;
use libris_core::store::EntityStore;
use libris_core::types::{DbId, RawRecord};
use libris_db::repositories::{
    AuthorRepo, BookRepo, BorrowingRepo, CategoryRepo, LibraryRepo, MemberRepo, ReviewRepo,
};
use libris_db::{DbPool, PgStore};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/{collection}
pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
) -> AppResult<Json<DataResponse<Vec<Value>>>> {
    let rows = list_rows(&state.pool, kind).await?;
    Ok(Json(DataResponse { data: rows }))
}

/// GET /api/v1/{collection}/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Value>>> {
    let row = fetch_row(&state.pool, kind, id).await?;
    Ok(Json(DataResponse { data: row }))
}

/// POST /api/v1/{collection}
pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DataResponse<Value>>)> {
    let raw = request_record(kind, body)?;

    let mut store = PgStore::new(state.pool.clone());
    store.begin_batch().await?;
    let result = state.catalog.create(&mut store, kind, &raw).await;
    let admitted = finish(&mut store, result).await?;

    tracing::info!(entity = %kind, id = admitted.id, "Record created");
    let row = fetch_row(&state.pool, kind, admitted.id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: row })))
}

/// PUT /api/v1/{collection}/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<DbId>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<DataResponse<Value>>> {
    let raw = request_record(kind, body)?;
    replace(&state, kind, id, raw).await
}

/// PATCH /api/v1/{collection}/{id}
///
/// The stored row with the body's fields laid over it goes through the
/// same validation and rules as a full update.
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<DbId>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<DataResponse<Value>>> {
    let patch = request_record(kind, body)?;
    let Value::Object(stored) = fetch_row(&state.pool, kind, id).await? else {
        return Err(AppError::InternalError(format!(
            "{kind} row {id} did not serialize to an object"
        )));
    };
    replace(&state, kind, id, overlay(kind, stored, patch)).await
}

async fn replace(
    state: &AppState,
    kind: EntityKind,
    id: DbId,
    raw: RawRecord,
) -> AppResult<Json<DataResponse<Value>>> {
    let mut store = PgStore::new(state.pool.clone());
    store.begin_batch().await?;
    let result = state.catalog.update(&mut store, kind, id, &raw).await;
    finish(&mut store, result).await?;

    tracing::info!(entity = %kind, id, "Record updated");
    let row = fetch_row(&state.pool, kind, id).await?;
    Ok(Json(DataResponse { data: row }))
}

/// DELETE /api/v1/{collection}/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<EntityKind>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let mut store = PgStore::new(state.pool.clone());
    store.begin_batch().await?;
    let result = state.catalog.delete(&mut store, kind, id).await;
    finish(&mut store, result).await?;

    tracing::info!(entity = %kind, id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Commit on success, roll back on failure.
async fn finish<T>(store: &mut PgStore, result: Result<T, CoreError>) -> Result<T, CoreError> {
    match result {
        Ok(value) => {
            store.commit_batch().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = store.rollback_batch().await {
                tracing::error!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// The request body as a raw record. Client-supplied ids are dropped; the
/// database assigns them.
fn request_record(kind: EntityKind, body: Result<Json<Value>, JsonRejection>) -> AppResult<RawRecord> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let Value::Object(mut raw) = value else {
        return Err(AppError::BadRequest("request body must be a JSON object".into()));
    };
    raw.remove("id");
    if let [own_key] = kind.key().fields {
        raw.remove(*own_key);
    }
    Ok(raw)
}

/// Lay `patch` over a stored row. A nested `address` is merged into the
/// flat address columns. For books, references given by natural key
/// replace the stored ids, and `available_copies` is dropped unless the
/// patch sets it so open loans are counted again.
fn overlay(kind: EntityKind, mut stored: RawRecord, patch: RawRecord) -> RawRecord {
    stored.remove("id");
    if kind == EntityKind::Book {
        for (natural, by_id) in [
            ("library", "library_id"),
            ("authors", "author_ids"),
            ("categories", "category_ids"),
        ] {
            if patch.contains_key(natural) {
                stored.remove(by_id);
            }
        }
        if !patch.contains_key("available_copies") {
            stored.remove("available_copies");
        }
    }
    for (field, value) in patch {
        match value {
            Value::Object(address) if field == "address" => stored.extend(address),
            value => {
                stored.insert(field, value);
            }
        }
    }
    stored
}

fn to_values<T: Serialize>(rows: Vec<T>) -> AppResult<Vec<Value>> {
    rows.into_iter().map(to_value).collect()
}

fn to_value<T: Serialize>(row: T) -> AppResult<Value> {
    serde_json::to_value(row).map_err(|e| AppError::InternalError(e.to_string()))
}

async fn list_rows(pool: &DbPool, kind: EntityKind) -> AppResult<Vec<Value>> {
    match kind {
        EntityKind::Library => to_values(LibraryRepo::list(pool).await?),
        EntityKind::Author => to_values(AuthorRepo::list(pool).await?),
        EntityKind::Category => to_values(CategoryRepo::list(pool).await?),
        EntityKind::Member => to_values(MemberRepo::list(pool).await?),
        EntityKind::Book => to_values(BookRepo::list(pool).await?),
        EntityKind::Borrowing => to_values(BorrowingRepo::list(pool).await?),
        EntityKind::Review => to_values(ReviewRepo::list(pool).await?),
        EntityKind::BookAuthor | EntityKind::BookCategory => Err(link_rows(kind)),
    }
}

async fn fetch_row(pool: &DbPool, kind: EntityKind, id: DbId) -> AppResult<Value> {
    let row = match kind {
        EntityKind::Library => LibraryRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::Author => AuthorRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::Category => CategoryRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::Member => MemberRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::Book => BookRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::Borrowing => BorrowingRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::Review => ReviewRepo::find_by_id(pool, id).await?.map(to_value),
        EntityKind::BookAuthor | EntityKind::BookCategory => return Err(link_rows(kind)),
    };
    row.unwrap_or_else(|| {
        Err(AppError::Core(CoreError::NotFound {
            entity: kind.label(),
            id,
        }))
    })
}

/// Links are read and written through their book.
fn link_rows(kind: EntityKind) -> AppError {
    AppError::BadRequest(format!("{kind} rows are managed through books"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn nested_address_is_merged_into_columns() {
        let stored = raw(json!({"id": 3, "name": "Central", "street": "1 Main St", "pin": "411001"}));
        let merged = overlay(
            EntityKind::Library,
            stored,
            raw(json!({"address": {"pin": "411002"}})),
        );
        assert_eq!(merged["street"], "1 Main St");
        assert_eq!(merged["pin"], "411002");
        assert!(!merged.contains_key("id"));
        assert!(!merged.contains_key("address"));
    }

    #[test]
    fn book_natural_references_replace_stored_ids() {
        let stored = raw(json!({
            "title": "Refactoring",
            "total_copies": 3,
            "available_copies": 1,
            "library_id": 1,
            "author_ids": [4],
            "category_ids": [],
        }));
        let merged = overlay(EntityKind::Book, stored, raw(json!({"authors": ["Martin Fowler"]})));
        assert!(!merged.contains_key("author_ids"));
        assert!(!merged.contains_key("available_copies"));
        assert_eq!(merged["library_id"], 1);
        assert_eq!(merged["category_ids"], json!([]));
    }
}
