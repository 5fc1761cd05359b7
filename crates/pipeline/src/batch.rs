//! One batch: a sequence of raw records of one kind, admitted in order
//! inside one store transaction.
//!
//! Each record gets its own savepoint. A recoverable rejection rolls back
//! that record only and is reported; anything else aborts the batch and
//! rolls everything back.

use libris_core::catalog::Catalog;
use libris_core::entity::EntityKind;
use libris_core::error::{CoreError, ErrorKind};
use libris_core::store::EntityStore;
use libris_core::types::{DbId, RawRecord};
use libris_core::validation::tracker::{ValidationSummary, ValidationTracker};
use serde::Serialize;

/// A record that was skipped, with enough context to find it in the input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Zero-based position in the batch.
    pub index: usize,
    /// Rendered source key, `N/A` when the record has none.
    pub key: String,
    pub kind: ErrorKind,
    pub fields: Vec<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub entity: EntityKind,
    pub summary: ValidationSummary,
    /// Ids assigned to admitted records, in input order.
    pub admitted: Vec<DbId>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("could not open a batch for {entity}: {source}")]
    Begin {
        entity: EntityKind,
        #[source]
        source: CoreError,
    },

    #[error("{entity} batch aborted at record {index}: {source}")]
    Aborted {
        entity: EntityKind,
        index: usize,
        #[source]
        source: CoreError,
    },

    #[error("{entity} batch failed to commit: {source}")]
    Commit {
        entity: EntityKind,
        #[source]
        source: CoreError,
    },
}

/// Admit `records` as one batch of `kind`.
///
/// Returns the report once the batch is committed. On error the batch has
/// been rolled back and nothing from it is persisted.
pub async fn run_batch<S>(
    catalog: &Catalog,
    store: &mut S,
    kind: EntityKind,
    records: &[RawRecord],
) -> Result<BatchReport, BatchError>
where
    S: EntityStore + ?Sized,
{
    store
        .begin_batch()
        .await
        .map_err(|source| BatchError::Begin { entity: kind, source })?;

    let mut tracker = ValidationTracker::new();
    let mut admitted = Vec::new();
    let mut rejected = Vec::new();

    for (index, raw) in records.iter().enumerate() {
        match admit(catalog, store, kind, raw).await {
            Ok(id) => {
                tracker.record_valid();
                admitted.push(id);
            }
            Err(Outcome::Rejected(err)) => {
                tracker.record_invalid();
                let rejection = Rejection {
                    index,
                    key: kind.key().render(raw),
                    kind: err.kind(),
                    fields: err.fields(),
                    reason: err.to_string(),
                };
                tracing::warn!(
                    entity = %kind,
                    key = %rejection.key,
                    fields = ?rejection.fields,
                    error_kind = ?rejection.kind,
                    reason = %rejection.reason,
                    "Record rejected"
                );
                rejected.push(rejection);
            }
            Err(Outcome::Fatal(source)) => {
                tracing::error!(entity = %kind, index, error = %source, "Aborting batch");
                discard(store, kind).await;
                return Err(BatchError::Aborted {
                    entity: kind,
                    index,
                    source,
                });
            }
        }
    }

    if let Err(source) = store.commit_batch().await {
        tracing::error!(entity = %kind, error = %source, "Batch commit failed");
        discard(store, kind).await;
        return Err(BatchError::Commit { entity: kind, source });
    }

    let summary = tracker.summary();
    tracing::info!(
        entity = %kind,
        valid = summary.valid,
        invalid = summary.invalid,
        total = summary.total,
        success_rate = summary.success_rate,
        "Batch complete"
    );

    Ok(BatchReport {
        entity: kind,
        summary,
        admitted,
        rejected,
    })
}

enum Outcome {
    Rejected(CoreError),
    Fatal(CoreError),
}

async fn admit<S>(
    catalog: &Catalog,
    store: &mut S,
    kind: EntityKind,
    raw: &RawRecord,
) -> Result<DbId, Outcome>
where
    S: EntityStore + ?Sized,
{
    store.begin_record().await.map_err(Outcome::Fatal)?;
    match catalog.create(store, kind, raw).await {
        Ok(admitted) => {
            store.commit_record().await.map_err(Outcome::Fatal)?;
            Ok(admitted.id)
        }
        Err(err) if err.is_recoverable() => {
            store.rollback_record().await.map_err(Outcome::Fatal)?;
            Err(Outcome::Rejected(err))
        }
        Err(err) => Err(Outcome::Fatal(err)),
    }
}

async fn discard<S>(store: &mut S, kind: EntityKind)
where
    S: EntityStore + ?Sized,
{
    if let Err(e) = store.rollback_batch().await {
        tracing::error!(entity = %kind, error = %e, "Batch rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use libris_core::store::memory::MemoryStore;
    use serde_json::{json, Value};

    use super::*;

    fn raw(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    fn categories() -> Vec<RawRecord> {
        vec![
            raw(json!({"category_id": "1", "name": "Fiction"})),
            raw(json!({"category_id": "2", "name": null})),
            raw(json!({"category_id": "3", "name": "fiction"})),
            raw(json!({"category_id": "4", "name": "Poetry", "description": "Verse"})),
        ]
    }

    #[tokio::test]
    async fn rejections_are_reported_and_skipped() {
        let mut store = MemoryStore::new();
        let report = run_batch(&Catalog::default(), &mut store, EntityKind::Category, &categories())
            .await
            .unwrap();

        assert_eq!(report.summary.valid, 2);
        assert_eq!(report.summary.invalid, 2);
        assert_eq!(report.summary.total, 4);
        assert_eq!(report.admitted, vec![1, 4]);

        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].key, "category_id=2");
        assert_eq!(report.rejected[0].kind, ErrorKind::InvalidField);
        assert_eq!(report.rejected[1].kind, ErrorKind::DuplicateEntity);
        assert_eq!(report.rejected[1].fields, vec!["name"]);

        assert_eq!(store.len(EntityKind::Category), 2);
    }

    #[tokio::test]
    async fn later_records_see_earlier_ones() {
        let mut store = MemoryStore::new();
        let records = vec![
            raw(json!({
                "library_id": "7",
                "name": "Central Library",
                "street": "1 Main St",
                "district": "Pune",
                "state": "MH",
                "pin": "411001",
                "contact_email": "desk@central.org",
            })),
        ];
        run_batch(&Catalog::default(), &mut store, EntityKind::Library, &records)
            .await
            .unwrap();

        let books = vec![raw(json!({
            "book_id": "3",
            "title": "Refactoring",
            "publication_date": "2018",
            "total_copies": "2",
            "library_id": "7",
        }))];
        let report = run_batch(&Catalog::default(), &mut store, EntityKind::Book, &books)
            .await
            .unwrap();
        assert_eq!(report.admitted, vec![3]);
    }

    #[tokio::test]
    async fn commit_failure_rolls_back_the_batch() {
        let mut store = MemoryStore::new();
        store.fail_next_commit();

        let err = run_batch(&Catalog::default(), &mut store, EntityKind::Category, &categories())
            .await
            .unwrap_err();
        assert_matches!(err, BatchError::Commit { entity: EntityKind::Category, .. });
        assert!(store.is_empty());

        // The store is usable again for the next batch.
        let report = run_batch(&Catalog::default(), &mut store, EntityKind::Category, &categories())
            .await
            .unwrap();
        assert_eq!(report.summary.valid, 2);
    }

    #[tokio::test]
    async fn empty_batch_has_zero_rate() {
        let mut store = MemoryStore::new();
        let report = run_batch(&Catalog::default(), &mut store, EntityKind::Review, &[])
            .await
            .unwrap();
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.success_rate, 0.0);
    }
}
