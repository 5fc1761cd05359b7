use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;
use libris_core::entity::NewBorrowing;
use libris_core::types::{DbId, Timestamp};

/// A row from the `borrowings` table. Open while `return_date` is null.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Borrowing {
    pub id: DbId,
    pub member_id: DbId,
    pub book_id: DbId,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub late_fee: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Borrowing> for NewBorrowing {
    fn from(row: Borrowing) -> Self {
        NewBorrowing {
            id: Some(row.id),
            member_id: row.member_id,
            book_id: row.book_id,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            return_date: row.return_date,
            late_fee: row.late_fee,
        }
    }
}
