//! Repository for the `authors` table.

use libris_core::entity::NewAuthor;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::author::Author;

/// Column list for authors queries.
const COLUMNS: &str =
    "id, first_name, last_name, birth_date, nationality, biography, created_at, updated_at";

/// Provides CRUD operations for authors.
pub struct AuthorRepo;

impl AuthorRepo {
    /// List all authors, ordered by id.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Author>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM authors ORDER BY id");
        sqlx::query_as::<_, Author>(&query).fetch_all(executor).await
    }

    /// Find an author by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Author>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM authors WHERE id = $1");
        sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert an author, returning its id.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewAuthor,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO authors (id, first_name, last_name, birth_date, nationality, biography)
             VALUES (COALESCE($1, nextval('authors_id_seq')), $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(input.id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.birth_date)
        .bind(&input.nationality)
        .bind(&input.biography)
        .fetch_one(executor)
        .await
    }

    /// Replace every field of an author. Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewAuthor,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE authors SET
                first_name = $2, last_name = $3, birth_date = $4, nationality = $5,
                biography = $6, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(input.birth_date)
        .bind(&input.nationality)
        .bind(&input.biography)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
