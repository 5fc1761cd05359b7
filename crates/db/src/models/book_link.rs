//! Link rows between books and authors or categories.

use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `book_authors` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookAuthor {
    pub id: DbId,
    pub book_id: DbId,
    pub author_id: DbId,
    pub created_at: Timestamp,
}

/// A row from the `book_categories` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookCategory {
    pub id: DbId,
    pub book_id: DbId,
    pub category_id: DbId,
    pub created_at: Timestamp,
}
