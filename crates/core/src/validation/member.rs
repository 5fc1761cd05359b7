use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{EntityKind, MemberType, NewMember};
use crate::error::FieldError;
use crate::types::RawRecord;

impl Validate for NewMember {
    const KIND: EntityKind = EntityKind::Member;

    fn validate(raw: &RawRecord, _ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "member_id"], fields::id);
        let first_name = f.required("first_name", fields::name(50));
        let last_name = f.required("last_name", fields::name(50));
        let email = f.required("email", fields::email(100));
        let phone = f.required("phone", fields::phone);
        let member_type = f.required("member_type", fields::choice::<MemberType>);

        let (Some(first_name), Some(last_name), Some(email), Some(phone), Some(member_type)) =
            (first_name, last_name, email, phone, member_type)
        else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewMember {
            id,
            first_name,
            last_name,
            email,
            phone,
            member_type,
        })
    }
}
