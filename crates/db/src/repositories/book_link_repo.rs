//! Repository for the `book_authors` and `book_categories` link tables.

use libris_core::entity::{BookAuthorLink, BookCategoryLink};
use libris_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::book_link::{BookAuthor, BookCategory};

/// Provides inserts and per-book listing for book links.
pub struct BookLinkRepo;

impl BookLinkRepo {
    pub async fn insert_author<'e, E: PgExecutor<'e>>(
        executor: E,
        link: &BookAuthorLink,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(link.book_id)
        .bind(link.author_id)
        .fetch_one(executor)
        .await
    }

    pub async fn insert_category<'e, E: PgExecutor<'e>>(
        executor: E,
        link: &BookCategoryLink,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO book_categories (book_id, category_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(link.book_id)
        .bind(link.category_id)
        .fetch_one(executor)
        .await
    }

    /// Authors linked to a book, in link order.
    pub async fn authors_of<'e, E: PgExecutor<'e>>(
        executor: E,
        book_id: DbId,
    ) -> Result<Vec<BookAuthor>, sqlx::Error> {
        sqlx::query_as::<_, BookAuthor>(
            "SELECT id, book_id, author_id, created_at FROM book_authors
             WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(executor)
        .await
    }

    /// Categories linked to a book, in link order.
    pub async fn categories_of<'e, E: PgExecutor<'e>>(
        executor: E,
        book_id: DbId,
    ) -> Result<Vec<BookCategory>, sqlx::Error> {
        sqlx::query_as::<_, BookCategory>(
            "SELECT id, book_id, category_id, created_at FROM book_categories
             WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(executor)
        .await
    }

    /// Replace every link of a book with the given author and category ids.
    pub async fn replace_for_book(
        conn: &mut PgConnection,
        book_id: DbId,
        author_ids: &[DbId],
        category_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM book_categories WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "INSERT INTO book_authors (book_id, author_id)
             SELECT $1, author_id FROM UNNEST($2::BIGINT[]) AS author_id",
        )
        .bind(book_id)
        .bind(author_ids)
        .execute(&mut *conn)
        .await?;
        sqlx::query(
            "INSERT INTO book_categories (book_id, category_id)
             SELECT $1, category_id FROM UNNEST($2::BIGINT[]) AS category_id",
        )
        .bind(book_id)
        .bind(category_ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
