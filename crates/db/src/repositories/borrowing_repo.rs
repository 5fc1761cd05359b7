//! Repository for the `borrowings` table.

use libris_core::entity::NewBorrowing;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::borrowing::Borrowing;

/// Column list for borrowings queries.
const COLUMNS: &str = "id, member_id, book_id, borrow_date, due_date, return_date, late_fee, \
                       created_at, updated_at";

/// Provides CRUD operations for borrowings.
pub struct BorrowingRepo;

impl BorrowingRepo {
    /// List all borrowings, most recent first.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Borrowing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM borrowings ORDER BY borrow_date DESC, id DESC");
        sqlx::query_as::<_, Borrowing>(&query).fetch_all(executor).await
    }

    /// Find a borrowing by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Borrowing>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM borrowings WHERE id = $1");
        sqlx::query_as::<_, Borrowing>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a borrowing, returning its id.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewBorrowing,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO borrowings
                (id, member_id, book_id, borrow_date, due_date, return_date, late_fee)
             VALUES (COALESCE($1, nextval('borrowings_id_seq')), $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(input.id)
        .bind(input.member_id)
        .bind(input.book_id)
        .bind(input.borrow_date)
        .bind(input.due_date)
        .bind(input.return_date)
        .bind(input.late_fee)
        .fetch_one(executor)
        .await
    }

    /// Replace the dates and late fee of a borrowing. Member and book never
    /// change. Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewBorrowing,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE borrowings SET
                borrow_date = $2, due_date = $3, return_date = $4, late_fee = $5,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.borrow_date)
        .bind(input.due_date)
        .bind(input.return_date)
        .bind(input.late_fee)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
