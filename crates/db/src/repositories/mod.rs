//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept any PostgreSQL executor (a pool or an open transaction) as
//! the first argument. Inserts take an optional explicit id; without one
//! the table's sequence assigns it.

pub mod author_repo;
pub mod book_link_repo;
pub mod book_repo;
pub mod borrowing_repo;
pub mod category_repo;
pub mod library_repo;
pub mod member_repo;
pub mod review_repo;

pub use author_repo::AuthorRepo;
pub use book_link_repo::BookLinkRepo;
pub use book_repo::BookRepo;
pub use borrowing_repo::BorrowingRepo;
pub use category_repo::CategoryRepo;
pub use library_repo::LibraryRepo;
pub use member_repo::MemberRepo;
pub use review_repo::ReviewRepo;

use libris_core::entity::EntityKind;
use libris_core::types::DbId;
use sqlx::PgExecutor;

/// Delete one row of `kind` by id. Returns `true` if a row was deleted.
pub async fn delete_row<'e, E>(executor: E, kind: EntityKind, id: DbId) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query = format!("DELETE FROM {} WHERE id = $1", kind.table());
    let result = sqlx::query(&query).bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

/// Move the id sequence of `kind`'s table past its highest id, after rows
/// were inserted with explicit ids.
pub async fn advance_sequence<'e, E>(executor: E, kind: EntityKind) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let table = kind.table();
    let query = format!(
        "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
         GREATEST((SELECT MAX(id) FROM {table}), 1))"
    );
    sqlx::query(&query).execute(executor).await?;
    Ok(())
}
