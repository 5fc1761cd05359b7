use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{EntityKind, NewReview};
use crate::error::{ErrorCode, FieldError};
use crate::types::RawRecord;

pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

impl Validate for NewReview {
    const KIND: EntityKind = EntityKind::Review;

    fn validate(raw: &RawRecord, ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "review_id"], fields::id);
        let member_id = f.required("member_id", fields::id);
        let book_id = f.required("book_id", fields::id);
        let rating = f.required("rating", fields::decimal);
        let comment = f.optional("comment", fields::text(500));
        let review_date = f.optional("review_date", fields::date).unwrap_or(ctx.today);

        if let Some(r) = rating {
            if !(MIN_RATING..=MAX_RATING).contains(&r) {
                f.push(
                    FieldError::new(
                        "rating",
                        ErrorCode::OutOfRange,
                        format!("must be between {MIN_RATING:.1} and {MAX_RATING:.1}"),
                    )
                    .with_raw(r.to_string()),
                );
            }
        }
        if review_date > ctx.today {
            f.push(
                FieldError::new("review_date", ErrorCode::OutOfRange, "must not be in the future")
                    .with_raw(review_date.to_string()),
            );
        }

        let (Some(member_id), Some(book_id), Some(rating)) = (member_id, book_id, rating) else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewReview {
            id,
            member_id,
            book_id,
            rating: (rating * 10.0).round() / 10.0,
            comment,
            review_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validation::test_support::{ctx, raw};

    #[test]
    fn rating_is_rounded_to_one_decimal() {
        let r = NewReview::validate(
            &raw(json!({"member_id": 7, "book_id": 3, "rating": "4.26", "comment": "  Great read "})),
            &ctx(),
        )
        .unwrap();
        assert_eq!(r.rating, 4.3);
        assert_eq!(r.comment.as_deref(), Some("Great read"));
        assert_eq!(r.review_date, ctx().today);
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        for (rating, ok) in [(1.0, true), (5.0, true), (0.9, false), (5.01, false)] {
            let result = NewReview::validate(
                &raw(json!({"member_id": 7, "book_id": 3, "rating": rating})),
                &ctx(),
            );
            assert_eq!(result.is_ok(), ok, "rating {rating}");
        }
    }

    #[test]
    fn comment_over_500_chars_is_rejected() {
        let errors = NewReview::validate(
            &raw(json!({"member_id": 7, "book_id": 3, "rating": 3, "comment": "x".repeat(501)})),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::TooLong);
    }

    #[test]
    fn canonical_output_revalidates_unchanged() {
        let first = NewReview::validate(
            &raw(json!({"review_id": 2, "member_id": "7", "book_id": 3, "rating": 3.95, "comment": " Dense "})),
            &ctx(),
        )
        .unwrap();
        let again = NewReview::validate(&raw(serde_json::to_value(&first).unwrap()), &ctx()).unwrap();
        assert_eq!(first, again);
    }
}
