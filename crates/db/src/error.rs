//! Mapping from sqlx errors onto the domain taxonomy.
//!
//! The rule engine catches duplicates, missing references and capacity
//! problems before anything is written. These mappings cover the database
//! constraints that back those checks up.

use libris_core::error::CoreError;

/// PostgreSQL SQLSTATE codes the store distinguishes.
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Classify a sqlx error raised while writing a row of `entity`.
pub fn map_sqlx_error(entity: &'static str, err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        let constraint = db_err.constraint().unwrap_or("unknown");
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return CoreError::DuplicateEntity {
                    entity,
                    fields: unique_fields(constraint),
                    message: format!("duplicate value violates {constraint}"),
                };
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                let field = foreign_key_field(constraint);
                return CoreError::ForeignKeyNotFound {
                    entity,
                    target: target_label(&field),
                    field,
                    value: "unknown".to_string(),
                };
            }
            Some(CHECK_VIOLATION) => {
                return CoreError::CapacityExceeded {
                    field: check_field(constraint),
                    message: format!("value violates {constraint}"),
                };
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, entity, "Database error");
    CoreError::Persistence(err.to_string())
}

/// Map a sqlx error from a statement that is not a write.
pub fn persistence(err: sqlx::Error) -> CoreError {
    tracing::error!(error = %err, "Database error");
    CoreError::Persistence(err.to_string())
}

/// Fields covered by a unique constraint, named `uq_<table>_<fields>` or
/// `<table>_pkey`.
fn unique_fields(constraint: &str) -> Vec<String> {
    let fields: &[&str] = match constraint {
        c if c.ends_with("_pkey") => &["id"],
        "uq_libraries_name_address" => &["name", "address"],
        "uq_libraries_contact_email" => &["contact_email"],
        "uq_libraries_phone" | "uq_members_phone" => &["phone"],
        "uq_members_email" => &["email"],
        "uq_categories_name" => &["name"],
        "uq_books_isbn" => &["isbn"],
        "uq_book_authors_pair" => &["book_id", "author_id"],
        "uq_book_categories_pair" => &["book_id", "category_id"],
        "uq_borrowings_open_loan" | "uq_reviews_member_book" => &["member_id", "book_id"],
        other => return vec![other.to_string()],
    };
    fields.iter().map(|f| f.to_string()).collect()
}

/// Column of a default-named foreign key, `<table>_<column>_fkey`.
fn foreign_key_field(constraint: &str) -> String {
    let Some(stem) = constraint.strip_suffix("_fkey") else {
        return constraint.to_string();
    };
    ["library_id", "author_id", "category_id", "member_id", "book_id"]
        .into_iter()
        .find(|column| stem.ends_with(column))
        .map_or_else(|| stem.to_string(), str::to_string)
}

fn target_label(field: &str) -> &'static str {
    match field {
        "library_id" => "Library",
        "author_id" => "Author",
        "category_id" => "Category",
        "member_id" => "Member",
        "book_id" => "Book",
        _ => "row",
    }
}

/// Field a named check constraint guards, `ck_<table>_<field>`.
fn check_field(constraint: &str) -> String {
    for table in ["books_", "borrowings_", "reviews_"] {
        if let Some(field) = constraint.strip_prefix("ck_").and_then(|c| c.strip_prefix(table)) {
            return field.to_string();
        }
    }
    constraint.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_constraints_name_their_fields() {
        assert_eq!(unique_fields("uq_members_email"), vec!["email"]);
        assert_eq!(unique_fields("authors_pkey"), vec!["id"]);
        assert_eq!(
            unique_fields("uq_book_authors_pair"),
            vec!["book_id", "author_id"]
        );
        assert_eq!(unique_fields("uq_something_else"), vec!["uq_something_else"]);
    }

    #[test]
    fn foreign_keys_resolve_column_and_target() {
        let field = foreign_key_field("book_categories_category_id_fkey");
        assert_eq!(field, "category_id");
        assert_eq!(target_label(&field), "Category");
        assert_eq!(foreign_key_field("odd_name"), "odd_name");
    }

    #[test]
    fn check_constraints_name_their_field() {
        assert_eq!(check_field("ck_books_available_copies"), "available_copies");
        assert_eq!(check_field("ck_reviews_rating"), "rating");
    }

    #[test]
    fn other_errors_are_persistence_failures() {
        let err = map_sqlx_error("Book", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, CoreError::Persistence(_)));
        assert!(!err.is_recoverable());
    }
}
