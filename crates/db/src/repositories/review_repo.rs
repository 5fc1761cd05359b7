//! Repository for the `reviews` table.

use libris_core::entity::NewReview;
use libris_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::review::Review;

/// Column list for reviews queries.
const COLUMNS: &str =
    "id, member_id, book_id, rating, comment, review_date, created_at, updated_at";

/// Provides CRUD operations for reviews.
pub struct ReviewRepo;

impl ReviewRepo {
    /// List all reviews, most recent first.
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews ORDER BY review_date DESC, id DESC");
        sqlx::query_as::<_, Review>(&query).fetch_all(executor).await
    }

    /// Find a review by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Review>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reviews WHERE id = $1");
        sqlx::query_as::<_, Review>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a review, returning its id.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewReview,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO reviews (id, member_id, book_id, rating, comment, review_date)
             VALUES (COALESCE($1, nextval('reviews_id_seq')), $2, $3, $4, $5, $6)
             RETURNING id",
        )
        .bind(input.id)
        .bind(input.member_id)
        .bind(input.book_id)
        .bind(input.rating)
        .bind(&input.comment)
        .bind(input.review_date)
        .fetch_one(executor)
        .await
    }

    /// Replace every field of a review. Returns `false` if it does not exist.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &NewReview,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reviews SET
                member_id = $2, book_id = $3, rating = $4, comment = $5, review_date = $6,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.member_id)
        .bind(input.book_id)
        .bind(input.rating)
        .bind(&input.comment)
        .bind(input.review_date)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
