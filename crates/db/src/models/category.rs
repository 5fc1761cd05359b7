use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `categories` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
