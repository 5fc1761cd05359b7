use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `reviews` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: DbId,
    pub member_id: DbId,
    pub book_id: DbId,
    pub rating: f64,
    pub comment: Option<String>,
    pub review_date: NaiveDate,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
