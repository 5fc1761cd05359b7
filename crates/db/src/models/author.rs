use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `authors` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Author {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
