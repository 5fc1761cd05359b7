use serde::Serialize;
use sqlx::FromRow;
use libris_core::types::{DbId, Timestamp};

/// A row from the `libraries` table. Address columns are flattened.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Library {
    pub id: DbId,
    pub name: String,
    pub street: String,
    pub district: String,
    pub state: String,
    pub pin: String,
    pub country: String,
    pub contact_email: String,
    pub phone: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
