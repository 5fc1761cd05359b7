use serde_json::Value;

use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{AuthorName, EntityKind, NewBook, Ref};
use crate::error::{ErrorCode, FieldError};
use crate::normalize::{normalize_name, NormalizeError};
use crate::types::RawRecord;

impl Validate for NewBook {
    const KIND: EntityKind = EntityKind::Book;

    /// References may be given by id (`library_id`, `author_ids`,
    /// `category_ids`) or by natural key (`library`, `authors`,
    /// `categories`). Whether natural keys resolve is up to the rule engine.
    fn validate(raw: &RawRecord, ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "book_id"], fields::id);
        let title = f.required("title", fields::title(200));
        let isbn = f.optional("isbn", fields::isbn(ctx.isbn_policy));
        let publication_date = f.required("publication_date", fields::date);
        let total_copies = f.required("total_copies", copies);
        let available_copies = f.optional("available_copies", copies);

        if let Some(total) = total_copies {
            if total <= 0 {
                f.push(
                    FieldError::new("total_copies", ErrorCode::OutOfRange, "must be greater than 0")
                        .with_raw(total.to_string()),
                );
            }
        }
        if let Some(available) = available_copies {
            if available < 0 {
                f.push(
                    FieldError::new("available_copies", ErrorCode::OutOfRange, "must not be negative")
                        .with_raw(available.to_string()),
                );
            }
        }
        if let (Some(total), Some(available)) = (total_copies, available_copies) {
            if available > total {
                f.push(FieldError::record(
                    "available_copies",
                    format!("available_copies ({available}) exceeds total_copies ({total})"),
                ));
            }
        }

        let library = if f.has_any(&["library_id"]) {
            f.required("library_id", fields::id).map(Ref::Id)
        } else {
            f.required("library", library_ref)
        };
        let authors = if f.has_any(&["author_ids"]) {
            f.optional("author_ids", fields::id_list)
                .map(|ids| ids.into_iter().map(Ref::Id).collect())
        } else {
            f.optional("authors", author_refs)
        };
        let categories = if f.has_any(&["category_ids"]) {
            f.optional("category_ids", fields::id_list)
                .map(|ids| ids.into_iter().map(Ref::Id).collect())
        } else {
            f.optional("categories", category_refs)
        };

        let (Some(title), Some(publication_date), Some(total_copies), Some(library)) =
            (title, publication_date, total_copies, library)
        else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewBook {
            id,
            title,
            isbn,
            publication_date,
            total_copies,
            available_copies: available_copies.unwrap_or(total_copies),
            library,
            authors: authors.unwrap_or_default(),
            categories: categories.unwrap_or_default(),
        })
    }
}

fn copies(value: &Value) -> Result<i32, NormalizeError> {
    let n = fields::integer(value)?;
    i32::try_from(n).map_err(|_| NormalizeError::new(ErrorCode::OutOfRange, "copy count is too large"))
}

/// Numeric text or a number is an id; anything else is a natural key.
fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(_) => fields::id(value).ok(),
        Value::String(s) if s.trim().bytes().all(|b| b.is_ascii_digit()) => fields::id(value).ok(),
        _ => None,
    }
}

fn library_ref(value: &Value) -> Result<Ref<String>, NormalizeError> {
    if let Some(id) = as_id(value) {
        return Ok(Ref::Id(id));
    }
    fields::title(100)(value).map(Ref::Natural)
}

/// Split a list value into entries: arrays as-is, text on `,`, `;` or `|`.
fn list_entries(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

fn author_refs(value: &Value) -> Result<Vec<Ref<AuthorName>>, NormalizeError> {
    list_entries(value).iter().map(author_ref).collect()
}

fn author_ref(value: &Value) -> Result<Ref<AuthorName>, NormalizeError> {
    if let Some(id) = as_id(value) {
        return Ok(Ref::Id(id));
    }
    match value {
        Value::Object(obj) => {
            let text_of = |key: &str| obj.get(key).and_then(Value::as_str).unwrap_or("");
            let birth_date = match obj.get("birth_date") {
                None | Some(Value::Null) => None,
                Some(v) if v.as_str().is_some_and(|s| s.trim().is_empty()) => None,
                Some(v) => Some(fields::date(v)?),
            };
            Ok(Ref::Natural(AuthorName {
                first_name: normalize_name(text_of("first_name"))?,
                last_name: normalize_name(text_of("last_name"))?,
                birth_date,
            }))
        }
        Value::String(full) => {
            let full = normalize_name(full)?;
            match full.rsplit_once(' ') {
                Some((first, last)) => Ok(Ref::Natural(AuthorName {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    birth_date: None,
                })),
                None => Err(NormalizeError::new(
                    ErrorCode::InvalidName,
                    format!("author '{full}' needs a first and last name"),
                )),
            }
        }
        _ => Err(NormalizeError::new(
            ErrorCode::InvalidName,
            "expected an author id, name or object",
        )),
    }
}

fn category_refs(value: &Value) -> Result<Vec<Ref<String>>, NormalizeError> {
    list_entries(value)
        .iter()
        .map(|entry| match as_id(entry) {
            Some(id) => Ok(Ref::Id(id)),
            None => fields::title(100)(entry).map(Ref::Natural),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::error::{CoreError, ErrorKind};
    use crate::normalize::IsbnPolicy;
    use crate::validation::test_support::{ctx, raw};

    fn book(overrides: Value) -> RawRecord {
        let mut base = raw(json!({
            "title": "Refactoring",
            "isbn": "978-0-13-468599-1",
            "publication_date": "2018-11-20",
            "total_copies": "3",
            "library_id": "1",
        }));
        base.extend(raw(overrides));
        base
    }

    #[test]
    fn isbn_is_normalized_and_available_defaults_to_total() {
        let b = NewBook::validate(&book(json!({})), &ctx()).unwrap();
        assert_eq!(b.isbn.as_deref(), Some("9780134685991"));
        assert_eq!(b.total_copies, 3);
        assert_eq!(b.available_copies, 3);
        assert_eq!(b.library, Ref::Id(1));
        assert_eq!(b.publication_date, NaiveDate::from_ymd_opt(2018, 11, 20).unwrap());
    }

    #[test]
    fn available_above_total_is_an_invalid_record() {
        let errors = NewBook::validate(
            &book(json!({"total_copies": 3, "available_copies": 5})),
            &ctx(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "available_copies");
        assert!(errors[0].reason.contains("exceeds total_copies"));
        assert_eq!(CoreError::Validation(errors).kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn copy_count_bounds() {
        let cases = [
            (json!({"total_copies": 0}), false),
            (json!({"total_copies": -1}), false),
            (json!({"available_copies": -1}), false),
            (json!({"available_copies": 4}), false),
            (json!({"available_copies": 0}), true),
            (json!({"available_copies": 3}), true),
        ];
        for (overrides, ok) in cases {
            let result = NewBook::validate(&book(overrides.clone()), &ctx());
            assert_eq!(result.is_ok(), ok, "case {overrides}");
        }
    }

    #[test]
    fn isbn_policy_comes_from_context() {
        let bad_check = book(json!({"isbn": "9780134685992"}));
        assert!(NewBook::validate(&bad_check, &ctx()).is_err());

        let mut lenient = ctx();
        lenient.isbn_policy = IsbnPolicy::PrefixOnly;
        assert!(NewBook::validate(&bad_check, &lenient).is_ok());
    }

    #[test]
    fn id_lists_from_text() {
        let b = NewBook::validate(
            &book(json!({"author_ids": "3;4", "category_ids": [7]})),
            &ctx(),
        )
        .unwrap();
        assert_eq!(b.authors, vec![Ref::Id(3), Ref::Id(4)]);
        assert_eq!(b.categories, vec![Ref::Id(7)]);
    }

    #[test]
    fn natural_references() {
        let b = NewBook::validate(
            &book(json!({
                "library_id": null,
                "library": "Central Library",
                "authors": [
                    "martin fowler",
                    {"first_name": "kent", "last_name": "beck", "birth_date": "1961-03-31"},
                    12
                ],
                "categories": "Software; 5",
            })),
            &ctx(),
        )
        .unwrap();

        assert_eq!(b.library, Ref::Natural("Central Library".into()));
        assert_eq!(
            b.authors,
            vec![
                Ref::Natural(AuthorName {
                    first_name: "Martin".into(),
                    last_name: "Fowler".into(),
                    birth_date: None,
                }),
                Ref::Natural(AuthorName {
                    first_name: "Kent".into(),
                    last_name: "Beck".into(),
                    birth_date: NaiveDate::from_ymd_opt(1961, 3, 31),
                }),
                Ref::Id(12),
            ]
        );
        assert_eq!(
            b.categories,
            vec![Ref::Natural("Software".into()), Ref::Id(5)]
        );
    }

    #[test]
    fn missing_library_is_required() {
        let errors = NewBook::validate(&book(json!({"library_id": ""})), &ctx()).unwrap_err();
        assert_eq!(errors[0].field, "library");
        assert_eq!(errors[0].code, ErrorCode::Required);
    }

    #[test]
    fn canonical_output_revalidates_unchanged() {
        let first = NewBook::validate(
            &book(json!({"authors": ["Martin Fowler", 2], "categories": ["Design"]})),
            &ctx(),
        )
        .unwrap();
        let again = NewBook::validate(&raw(serde_json::to_value(&first).unwrap()), &ctx()).unwrap();
        assert_eq!(first, again);
    }
}
