use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{EntityKind, NewAuthor};
use crate::error::{ErrorCode, FieldError};
use crate::types::RawRecord;

impl Validate for NewAuthor {
    const KIND: EntityKind = EntityKind::Author;

    fn validate(raw: &RawRecord, ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "author_id"], fields::id);
        let first_name = f.required("first_name", fields::name(50));
        let last_name = f.required("last_name", fields::name(50));
        let birth_date = f.optional("birth_date", fields::date);
        let nationality = f.optional("nationality", fields::text(50));
        let biography = f.optional("biography", fields::text(1000));

        if let Some(born) = birth_date {
            if born > ctx.today {
                f.push(
                    FieldError::new("birth_date", ErrorCode::OutOfRange, "must not be in the future")
                        .with_raw(born.to_string()),
                );
            }
        }

        let (Some(first_name), Some(last_name)) = (first_name, last_name) else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewAuthor {
            id,
            first_name,
            last_name,
            birth_date,
            nationality,
            biography,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::validation::test_support::{ctx, raw};

    #[test]
    fn author_is_normalized() {
        let author = NewAuthor::validate(
            &raw(json!({
                "first_name": " jane ",
                "last_name": "O'Brien",
                "birth_date": "7 February 1812",
                "nationality": "British",
            })),
            &ctx(),
        )
        .unwrap();

        assert_eq!(
            author,
            NewAuthor {
                id: None,
                first_name: "Jane".into(),
                last_name: "O'Brien".into(),
                birth_date: NaiveDate::from_ymd_opt(1812, 2, 7),
                nationality: Some("British".into()),
                biography: None,
            }
        );
    }

    #[test]
    fn canonical_output_revalidates_unchanged() {
        let first = NewAuthor::validate(
            &raw(json!({"first_name": "charles", "last_name": "DICKENS", "birth_date": "1812"})),
            &ctx(),
        )
        .unwrap();
        let again = NewAuthor::validate(&raw(serde_json::to_value(&first).unwrap()), &ctx()).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn invalid_names_and_dates_are_all_reported() {
        let errors = NewAuthor::validate(
            &raw(json!({"first_name": "J4ne", "last_name": "", "birth_date": "someday"})),
            &ctx(),
        )
        .unwrap_err();

        let codes: Vec<_> = errors.iter().map(|e| (e.field.as_str(), e.code)).collect();
        assert_eq!(
            codes,
            vec![
                ("first_name", ErrorCode::InvalidName),
                ("last_name", ErrorCode::Required),
                ("birth_date", ErrorCode::InvalidDate),
            ]
        );
    }

    #[test]
    fn future_birth_date_is_rejected() {
        let errors = NewAuthor::validate(
            &raw(json!({"first_name": "A", "last_name": "B", "birth_date": "2999-01-01"})),
            &ctx(),
        )
        .unwrap_err();
        assert_eq!(errors[0].code, ErrorCode::OutOfRange);
    }
}
