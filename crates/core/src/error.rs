//! Domain error taxonomy shared by every crate in the workspace.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Machine-readable reason attached to a [`FieldError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Required,
    TooLong,
    InvalidText,
    InvalidDate,
    InvalidPhone,
    InvalidName,
    InvalidIsbn,
    InvalidEmail,
    InvalidNumber,
    OutOfRange,
    InvalidChoice,
    /// A cross-field invariant failed (e.g. available copies above total).
    InvalidRecord,
}

/// A single problem found while validating one field of a raw record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct FieldError {
    pub field: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<String>,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            raw_value: None,
            reason: reason.into(),
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw_value = Some(raw.into());
        self
    }

    /// A cross-field failure reported against `field`.
    pub fn record(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(field, ErrorCode::InvalidRecord, reason)
    }
}

/// Error categories used for logging, reporting and propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidField,
    InvalidRecord,
    ForeignKeyNotFound,
    DuplicateEntity,
    CapacityExceeded,
    NotFound,
    PersistenceFailure,
    Internal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("{entity}.{field} references missing {target} {value}")]
    ForeignKeyNotFound {
        entity: &'static str,
        field: String,
        target: &'static str,
        value: String,
    },

    #[error("duplicate {entity}: {message}")]
    DuplicateEntity {
        entity: &'static str,
        fields: Vec<String>,
        message: String,
    },

    #[error("capacity exceeded: {message}")]
    CapacityExceeded { field: String, message: String },

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn duplicate(entity: &'static str, fields: &[&str], message: impl Into<String>) -> Self {
        Self::DuplicateEntity {
            entity,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            message: message.into(),
        }
    }

    pub fn capacity(field: &str, message: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Map onto the reporting taxonomy. A validation failure counts as
    /// `InvalidRecord` only when every error is a cross-field one.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::Validation(errors) => {
                if !errors.is_empty() && errors.iter().all(|e| e.code == ErrorCode::InvalidRecord)
                {
                    ErrorKind::InvalidRecord
                } else {
                    ErrorKind::InvalidField
                }
            }
            CoreError::ForeignKeyNotFound { .. } => ErrorKind::ForeignKeyNotFound,
            CoreError::DuplicateEntity { .. } => ErrorKind::DuplicateEntity,
            CoreError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            CoreError::Persistence(_) => ErrorKind::PersistenceFailure,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a batch may skip the offending record and carry on.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, CoreError::Persistence(_) | CoreError::Internal(_))
    }

    /// Names of the fields the error is about, for log lines and reports.
    pub fn fields(&self) -> Vec<String> {
        match self {
            CoreError::Validation(errors) => {
                let mut fields: Vec<String> = Vec::with_capacity(errors.len());
                for e in errors {
                    if !fields.contains(&e.field) {
                        fields.push(e.field.clone());
                    }
                }
                fields
            }
            CoreError::ForeignKeyNotFound { field, .. } => vec![field.clone()],
            CoreError::DuplicateEntity { fields, .. } => fields.clone(),
            CoreError::CapacityExceeded { field, .. } => vec![field.clone()],
            CoreError::NotFound { .. } => vec!["id".to_string()],
            CoreError::Persistence(_) | CoreError::Internal(_) => Vec::new(),
        }
    }
}

impl From<Vec<FieldError>> for CoreError {
    fn from(errors: Vec<FieldError>) -> Self {
        CoreError::Validation(errors)
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_field_only_is_invalid_record() {
        let err = CoreError::Validation(vec![FieldError::record(
            "available_copies",
            "available_copies (5) exceeds total_copies (3)",
        )]);
        assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    }

    #[test]
    fn mixed_errors_are_invalid_field() {
        let err = CoreError::Validation(vec![
            FieldError::record("due_date", "before borrow_date"),
            FieldError::new("member_id", ErrorCode::Required, "field is required"),
        ]);
        assert_eq!(err.kind(), ErrorKind::InvalidField);
    }

    #[test]
    fn persistence_is_not_recoverable() {
        assert!(!CoreError::Persistence("connection reset".into()).is_recoverable());
        assert!(CoreError::capacity("member_id", "limit reached").is_recoverable());
    }

    #[test]
    fn fields_are_deduplicated_in_order() {
        let err = CoreError::Validation(vec![
            FieldError::new("phone", ErrorCode::InvalidPhone, "bad"),
            FieldError::new("email", ErrorCode::InvalidEmail, "bad"),
            FieldError::new("phone", ErrorCode::TooLong, "bad"),
        ]);
        assert_eq!(err.fields(), vec!["phone", "email"]);
    }

    #[test]
    fn validation_message_lists_every_field() {
        let err = CoreError::Validation(vec![
            FieldError::new("name", ErrorCode::Required, "field is required"),
            FieldError::new("phone", ErrorCode::InvalidPhone, "not a valid phone number"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: name: field is required; phone: not a valid phone number"
        );
    }
}
