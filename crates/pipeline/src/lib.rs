//! Batch ingestion of library records.
//!
//! A batch is one input file (or one API request, or one Open Library
//! import) admitted record by record through [`libris_core::catalog::Catalog`]
//! inside one store transaction.

pub mod batch;
pub mod config;
pub mod openlibrary_import;
pub mod runner;
pub mod source;

pub use batch::{run_batch, BatchError, BatchReport, Rejection};
pub use runner::{ingest_directory, RunReport};
