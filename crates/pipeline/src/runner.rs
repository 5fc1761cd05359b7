//! Ingest a directory of CSV files, one batch per file, in dependency order.

use std::path::{Path, PathBuf};

use libris_core::catalog::Catalog;
use libris_core::entity::EntityKind;
use libris_core::store::EntityStore;
use serde::Serialize;

use crate::batch::{run_batch, BatchReport};
use crate::source::read_file;

/// A file whose batch did not complete.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub entity: EntityKind,
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub batches: Vec<BatchReport>,
    pub failures: Vec<BatchFailure>,
    /// Kinds with no input file.
    pub skipped: Vec<EntityKind>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn batch(&self, entity: EntityKind) -> Option<&BatchReport> {
        self.batches.iter().find(|b| b.entity == entity)
    }
}

/// The input file for `kind` inside `dir`, e.g. `dir/books.csv`.
pub fn csv_path(dir: &Path, kind: EntityKind) -> PathBuf {
    dir.join(format!("{}.csv", kind.table()))
}

/// Run every `<table>.csv` found in `dir`.
///
/// A failed batch is rolled back and recorded; later files still run, and
/// their records referencing the lost rows are rejected individually.
pub async fn ingest_directory<S>(catalog: &Catalog, store: &mut S, dir: &Path) -> RunReport
where
    S: EntityStore + ?Sized,
{
    let mut report = RunReport::default();

    for kind in EntityKind::INGEST_ORDER {
        let path = csv_path(dir, kind);
        if !path.is_file() {
            tracing::info!(entity = %kind, path = %path.display(), "No input file, skipping");
            report.skipped.push(kind);
            continue;
        }

        let records = match read_file(&path) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(entity = %kind, error = %e, "Could not read input file");
                report.failures.push(BatchFailure {
                    entity: kind,
                    path,
                    error: e.to_string(),
                });
                continue;
            }
        };

        tracing::info!(entity = %kind, path = %path.display(), records = records.len(), "Ingesting file");
        match run_batch(catalog, store, kind, &records).await {
            Ok(batch) => report.batches.push(batch),
            Err(e) => report.failures.push(BatchFailure {
                entity: kind,
                path,
                error: e.to_string(),
            }),
        }
    }

    report
}
