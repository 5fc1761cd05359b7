use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `books` table, with its linked author and category ids.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: DbId,
    pub title: String,
    pub isbn: Option<String>,
    pub publication_date: NaiveDate,
    pub total_copies: i32,
    pub available_copies: i32,
    pub library_id: DbId,
    pub author_ids: Vec<DbId>,
    pub category_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
