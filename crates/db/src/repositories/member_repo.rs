//! Repository for the `members` table.

use libris_core::entity::NewMember;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::member::Member;

/// Column list for members queries.
const COLUMNS: &str = "id, first_name, last_name, email, phone, member_type, registration_date, \
                       created_at, updated_at";

/// Provides CRUD operations for members.
pub struct MemberRepo;

impl MemberRepo {
    /// List all members, ordered by id.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members ORDER BY id");
        sqlx::query_as::<_, Member>(&query).fetch_all(executor).await
    }

    /// Find a member by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE id = $1");
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a member, returning its id. The registration date is set by
    /// the database.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewMember,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO members (id, first_name, last_name, email, phone, member_type)
             VALUES (COALESCE($1, nextval('members_id_seq')), $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(input.id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.member_type.as_str())
        .fetch_one(executor)
        .await
    }

    /// Replace every field of a member except its registration date.
    /// Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewMember,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE members SET
                first_name = $2, last_name = $3, email = $4, phone = $5, member_type = $6,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.member_type.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
