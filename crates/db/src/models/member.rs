use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `members` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Member {
    pub id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    /// `Student` or `Faculty`.
    pub member_type: String,
    pub registration_date: NaiveDate,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
