//! Repository for the `categories` table.

use libris_core::entity::NewCategory;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::category::Category;

/// Column list for categories queries.
const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Provides CRUD operations for categories.
pub struct CategoryRepo;

impl CategoryRepo {
    /// List all categories, ordered by name ascending.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories ORDER BY name ASC");
        sqlx::query_as::<_, Category>(&query).fetch_all(executor).await
    }

    /// Find a category by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a category, returning its id.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewCategory,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO categories (id, name, description)
             VALUES (COALESCE($1, nextval('categories_id_seq')), $2, $3)
             RETURNING id",
        )
        .bind(input.id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(executor)
        .await
    }

    /// Replace every field of a category. Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewCategory,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE categories SET name = $2, description = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
