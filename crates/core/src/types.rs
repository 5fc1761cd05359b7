/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// An untyped input record as it arrives from a CSV row, an API body or a
/// remote bibliographic service. Keys are source column names.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;
