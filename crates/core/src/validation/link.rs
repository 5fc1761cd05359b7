use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{BookAuthorLink, BookCategoryLink, EntityKind};
use crate::error::FieldError;
use crate::types::RawRecord;

impl Validate for BookAuthorLink {
    const KIND: EntityKind = EntityKind::BookAuthor;

    fn validate(raw: &RawRecord, _ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let book_id = f.required("book_id", fields::id);
        let author_id = f.required("author_id", fields::id);

        let (Some(book_id), Some(author_id)) = (book_id, author_id) else {
            return Err(f.into_errors());
        };
        f.finish()?;
        Ok(BookAuthorLink { book_id, author_id })
    }
}

impl Validate for BookCategoryLink {
    const KIND: EntityKind = EntityKind::BookCategory;

    fn validate(raw: &RawRecord, _ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let book_id = f.required("book_id", fields::id);
        let category_id = f.required("category_id", fields::id);

        let (Some(book_id), Some(category_id)) = (book_id, category_id) else {
            return Err(f.into_errors());
        };
        f.finish()?;
        Ok(BookCategoryLink {
            book_id,
            category_id,
        })
    }
}
