//! Referential integrity checker.
//!
//! Walks the foreign keys declared by a record's [`EntityKind`] and asks the
//! store whether each referenced id exists. Stops at the first miss.

use crate::entity::Record;
use crate::error::CoreError;
use crate::store::{EntityStore, Lookup};

pub async fn check_references<S>(store: &mut S, record: &Record) -> Result<(), CoreError>
where
    S: EntityStore + ?Sized,
{
    let kind = record.kind();
    for fk in kind.foreign_keys() {
        for id in record.reference_ids(fk.field) {
            if !store.exists(&Lookup::by_id(fk.target, id)).await? {
                return Err(CoreError::ForeignKeyNotFound {
                    entity: kind.label(),
                    field: fk.field.to_string(),
                    target: fk.target.label(),
                    value: id.to_string(),
                });
            }
        }
    }
    Ok(())
}
