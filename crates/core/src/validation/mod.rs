//! Entity validators.
//!
//! Each canonical record type implements [`Validate`]: a pure function from
//! a raw record to either the canonical record or every field error found.
//! No store access happens here.

pub mod author;
pub mod book;
pub mod borrowing;
pub mod category;
pub mod fields;
pub mod library;
pub mod link;
pub mod member;
pub mod review;
pub mod tracker;

use chrono::NaiveDate;

use crate::entity::{EntityKind, KeyDescriptor, Record};
use crate::error::FieldError;
use crate::normalize::IsbnPolicy;
use crate::types::RawRecord;

/// Default loan period when a borrowing has no due date.
pub const DEFAULT_LOAN_PERIOD_DAYS: i64 = 14;

/// Inputs a validator needs besides the record itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    /// The date "today" is compared against (borrow and return dates).
    pub today: NaiveDate,
    pub isbn_policy: IsbnPolicy,
    pub loan_period_days: i64,
}

impl ValidationContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            isbn_policy: IsbnPolicy::default(),
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}

/// A canonical record that can be built from a raw one.
pub trait Validate: Sized {
    const KIND: EntityKind;

    /// Source columns identifying a record of this type.
    fn key() -> KeyDescriptor {
        Self::KIND.key()
    }

    fn validate(raw: &RawRecord, ctx: &ValidationContext) -> Result<Self, Vec<FieldError>>;
}

/// Validate a raw record as `kind`.
pub fn validate_record(
    kind: EntityKind,
    raw: &RawRecord,
    ctx: &ValidationContext,
) -> Result<Record, Vec<FieldError>> {
    use crate::entity::*;

    Ok(match kind {
        EntityKind::Library => Record::Library(NewLibrary::validate(raw, ctx)?),
        EntityKind::Author => Record::Author(NewAuthor::validate(raw, ctx)?),
        EntityKind::Category => Record::Category(NewCategory::validate(raw, ctx)?),
        EntityKind::Member => Record::Member(NewMember::validate(raw, ctx)?),
        EntityKind::Book => Record::Book(NewBook::validate(raw, ctx)?),
        EntityKind::BookAuthor => Record::BookAuthor(BookAuthorLink::validate(raw, ctx)?),
        EntityKind::BookCategory => Record::BookCategory(BookCategoryLink::validate(raw, ctx)?),
        EntityKind::Borrowing => Record::Borrowing(NewBorrowing::validate(raw, ctx)?),
        EntityKind::Review => Record::Review(NewReview::validate(raw, ctx)?),
    })
}
