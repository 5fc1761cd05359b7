pub mod ingest;
pub mod records;
