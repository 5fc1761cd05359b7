use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{EntityKind, NewCategory};
use crate::error::FieldError;
use crate::types::RawRecord;

impl Validate for NewCategory {
    const KIND: EntityKind = EntityKind::Category;

    fn validate(raw: &RawRecord, _ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "category_id"], fields::id);
        let name = f.required("name", fields::title(100));
        let description = f.optional("description", fields::text(500));

        let Some(name) = name else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewCategory {
            id,
            name,
            description,
        })
    }
}
