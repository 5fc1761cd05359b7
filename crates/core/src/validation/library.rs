use serde_json::Value;

use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{Address, EntityKind, NewLibrary};
use crate::error::FieldError;
use crate::types::RawRecord;

pub const DEFAULT_COUNTRY: &str = "India";

impl Validate for NewLibrary {
    const KIND: EntityKind = EntityKind::Library;

    /// Address fields come either nested under `address` or as flat columns.
    fn validate(raw: &RawRecord, _ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let nested = match raw.get("address") {
            Some(Value::Object(address)) => Some(address.clone()),
            _ => None,
        };
        let address_source = nested.as_ref().unwrap_or(raw);

        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "library_id"], fields::id);
        let name = f.required("name", fields::title(100));
        let contact_email = f.required("contact_email", fields::email(100));
        let phone = f.optional("phone", fields::phone);

        let mut a = Fields::new(address_source);
        let street = a.required("street", fields::text(100));
        let district = a.required("district", fields::text(50));
        let state = a.required("state", fields::text(50));
        let pin = a.required("pin", fields::text(10));
        let country = a
            .optional("country", fields::text(50))
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());

        for mut e in a.into_errors() {
            if nested.is_some() {
                e.field = format!("address.{}", e.field);
            }
            f.push(e);
        }

        let (Some(name), Some(contact_email), Some(street), Some(district), Some(state), Some(pin)) =
            (name, contact_email, street, district, state, pin)
        else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewLibrary {
            id,
            name,
            address: Address {
                street,
                district,
                state,
                pin,
                country,
            },
            contact_email,
            phone,
        })
    }
}
