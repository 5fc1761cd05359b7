//! Repository for the `libraries` table.

use libris_core::entity::NewLibrary;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::library::Library;

/// Column list for libraries queries.
const COLUMNS: &str = "id, name, street, district, state, pin, country, contact_email, phone, \
                       created_at, updated_at";

/// Provides CRUD operations for libraries.
pub struct LibraryRepo;

impl LibraryRepo {
    /// List all libraries, ordered by id.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Library>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM libraries ORDER BY id");
        sqlx::query_as::<_, Library>(&query).fetch_all(executor).await
    }

    /// Find a library by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Library>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM libraries WHERE id = $1");
        sqlx::query_as::<_, Library>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a library, returning its id.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewLibrary,
    ) -> Result<DbId, sqlx::Error> {
        let a = &input.address;
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO libraries
                (id, name, street, district, state, pin, country, contact_email, phone)
             VALUES (COALESCE($1, nextval('libraries_id_seq')), $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id",
        )
        .bind(input.id)
        .bind(&input.name)
        .bind(&a.street)
        .bind(&a.district)
        .bind(&a.state)
        .bind(&a.pin)
        .bind(&a.country)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .fetch_one(executor)
        .await
    }

    /// Replace every field of a library. Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewLibrary,
    ) -> Result<bool, sqlx::Error> {
        let a = &input.address;
        let result = sqlx::query(
            "UPDATE libraries SET
                name = $2, street = $3, district = $4, state = $5, pin = $6, country = $7,
                contact_email = $8, phone = $9, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&a.street)
        .bind(&a.district)
        .bind(&a.state)
        .bind(&a.pin)
        .bind(&a.country)
        .bind(&input.contact_email)
        .bind(&input.phone)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
