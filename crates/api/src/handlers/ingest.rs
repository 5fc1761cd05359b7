//! Handler for `POST /api/v1/ingest/{entity}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use libris_core::entity::EntityKind;
use libris_core::types::RawRecord;
use libris_db::PgStore;
use libris_pipeline::{run_batch, BatchError, BatchReport};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/ingest/{entity}
///
/// Runs the JSON array in the body as one batch. Source ids in the records
/// are kept, so later batches can reference them. Rejected records are
/// listed in the report; the request only fails if the batch is aborted.
pub async fn ingest(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    body: Result<Json<Vec<Value>>, JsonRejection>,
) -> AppResult<Json<DataResponse<BatchReport>>> {
    let kind: EntityKind = entity.parse().map_err(AppError::BadRequest)?;
    let Json(values) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let records = values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(raw) => Ok(raw),
            _ => Err(AppError::BadRequest(format!(
                "record {index} is not a JSON object"
            ))),
        })
        .collect::<AppResult<Vec<RawRecord>>>()?;

    let mut store = PgStore::new(state.pool.clone());
    let report = run_batch(&state.catalog, &mut store, kind, &records)
        .await
        .map_err(|e| match e {
            BatchError::Begin { source, .. }
            | BatchError::Aborted { source, .. }
            | BatchError::Commit { source, .. } => AppError::Core(source),
        })?;

    Ok(Json(DataResponse { data: report }))
}
