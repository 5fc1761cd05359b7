//! Repository for the `books` table.

use libris_core::entity::NewBook;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::book::Book;

/// Column list for books queries, including the linked ids.
const COLUMNS: &str = "id, title, isbn, publication_date, total_copies, available_copies, library_id, \
     ARRAY(SELECT ba.author_id FROM book_authors ba WHERE ba.book_id = books.id ORDER BY ba.id) AS author_ids, \
     ARRAY(SELECT bc.category_id FROM book_categories bc WHERE bc.book_id = books.id ORDER BY bc.id) AS category_ids, \
     created_at, updated_at";

/// Provides CRUD operations for books and their copy counter.
pub struct BookRepo;

impl BookRepo {
    /// List all books, ordered by id.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Book>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM books ORDER BY id");
        sqlx::query_as::<_, Book>(&query).fetch_all(executor).await
    }

    /// Find a book by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Book>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM books WHERE id = $1");
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a book row held by `library_id`, returning its id. Author and
    /// category links are written separately.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewBook,
        library_id: DbId,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO books
                (id, title, isbn, publication_date, total_copies, available_copies, library_id)
             VALUES (COALESCE($1, nextval('books_id_seq')), $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(input.id)
        .bind(&input.title)
        .bind(&input.isbn)
        .bind(input.publication_date)
        .bind(input.total_copies)
        .bind(input.available_copies)
        .bind(library_id)
        .fetch_one(executor)
        .await
    }

    /// Replace every column of a book row. Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewBook,
        library_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE books SET
                title = $2, isbn = $3, publication_date = $4, total_copies = $5,
                available_copies = $6, library_id = $7, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.isbn)
        .bind(input.publication_date)
        .bind(input.total_copies)
        .bind(input.available_copies)
        .bind(library_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Current available copies, or `None` if the book does not exist.
    pub async fn available_copies<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>("SELECT available_copies FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Add `delta` to the available copies, returning the new value. The
    /// `ck_books_available_copies` constraint keeps it within `0..=total`.
    pub async fn adjust_available_copies<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        delta: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE books SET available_copies = available_copies + $2, updated_at = NOW()
             WHERE id = $1
             RETURNING available_copies",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await
    }
}
