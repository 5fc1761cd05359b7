//! Field combinators over a raw record.
//!
//! [`Fields`] walks a [`RawRecord`], applies one parser per declared field
//! and keeps going after a failure so every problem in the record is
//! reported at once. `null`, missing and blank values all count as absent.

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{ErrorCode, FieldError};
use crate::normalize::{self, IsbnPolicy, NormalizeError};
use crate::types::{DbId, RawRecord};

/// Collects field errors while values are pulled out of a raw record.
pub struct Fields<'a> {
    raw: &'a RawRecord,
    errors: Vec<FieldError>,
}

impl<'a> Fields<'a> {
    pub fn new(raw: &'a RawRecord) -> Self {
        Self {
            raw,
            errors: Vec::new(),
        }
    }

    /// The value under `name`, unless it is missing, `null` or blank.
    pub fn present(&self, name: &str) -> Option<&'a Value> {
        match self.raw.get(name)? {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            value => Some(value),
        }
    }

    /// Parse a field that must be present.
    pub fn required<T>(
        &mut self,
        name: &str,
        parse: impl FnOnce(&Value) -> Result<T, NormalizeError>,
    ) -> Option<T> {
        match self.present(name) {
            Some(value) => self.apply(name, value, parse),
            None => {
                self.errors.push(FieldError::new(
                    name,
                    ErrorCode::Required,
                    "field is required",
                ));
                None
            }
        }
    }

    /// Parse a field that may be absent. `None` means absent or invalid;
    /// an invalid value has already been recorded.
    pub fn optional<T>(
        &mut self,
        name: &str,
        parse: impl FnOnce(&Value) -> Result<T, NormalizeError>,
    ) -> Option<T> {
        let value = self.present(name)?;
        self.apply(name, value, parse)
    }

    /// Like [`Fields::optional`], trying several source column names in
    /// order and reporting errors under the first one that is present.
    pub fn optional_any<T>(
        &mut self,
        names: &[&str],
        parse: impl FnOnce(&Value) -> Result<T, NormalizeError>,
    ) -> Option<T> {
        let (name, value) = names
            .iter()
            .find_map(|name| self.present(name).map(|v| (*name, v)))?;
        self.apply(name, value, parse)
    }

    /// Whether any of `names` carries a value.
    pub fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.present(name).is_some())
    }

    /// Record an error not tied to a single parser, e.g. a cross-field check.
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// `Ok` when no error was recorded.
    pub fn finish(self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn apply<T>(
        &mut self,
        name: &str,
        value: &Value,
        parse: impl FnOnce(&Value) -> Result<T, NormalizeError>,
    ) -> Option<T> {
        match parse(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                self.errors.push(FieldError {
                    field: name.to_string(),
                    code: e.code,
                    raw_value: Some(raw_text(value)),
                    reason: e.reason,
                });
                None
            }
        }
    }
}

/// Render a JSON value the way it would have appeared in a source file.
pub fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

fn as_text(value: &Value) -> Result<String, NormalizeError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(NormalizeError::new(
            ErrorCode::InvalidText,
            "expected a text value",
        )),
    }
}

fn check_len(text: String, max_len: usize) -> Result<String, NormalizeError> {
    let len = text.chars().count();
    if len > max_len {
        return Err(NormalizeError::new(
            ErrorCode::TooLong,
            format!("must be at most {max_len} characters (got {len})"),
        ));
    }
    Ok(text)
}

/// Trimmed free text of at most `max_len` characters.
pub fn text(max_len: usize) -> impl Fn(&Value) -> Result<String, NormalizeError> {
    move |value| check_len(as_text(value)?, max_len)
}

/// Trimmed text with inner whitespace collapsed.
pub fn title(max_len: usize) -> impl Fn(&Value) -> Result<String, NormalizeError> {
    move |value| {
        let collapsed = as_text(value)?
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        check_len(collapsed, max_len)
    }
}

pub fn name(max_len: usize) -> impl Fn(&Value) -> Result<String, NormalizeError> {
    move |value| check_len(normalize::normalize_name(&as_text(value)?)?, max_len)
}

pub fn email(max_len: usize) -> impl Fn(&Value) -> Result<String, NormalizeError> {
    move |value| check_len(normalize::normalize_email(&as_text(value)?)?, max_len)
}

pub fn phone(value: &Value) -> Result<String, NormalizeError> {
    normalize::normalize_phone(&as_text(value)?)
}

pub fn date(value: &Value) -> Result<NaiveDate, NormalizeError> {
    match value {
        Value::String(s) => normalize::normalize_date(s.as_str()),
        Value::Number(n) => normalize::normalize_date(n.to_string().as_str()),
        _ => Err(NormalizeError::new(
            ErrorCode::InvalidDate,
            "expected a date string",
        )),
    }
}

pub fn isbn(policy: IsbnPolicy) -> impl Fn(&Value) -> Result<String, NormalizeError> {
    move |value| normalize::normalize_isbn(&as_text(value)?, policy)
}

/// A whole number, given as a JSON number or numeric text (`"3"`, `"3.0"`).
pub fn integer(value: &Value) -> Result<i64, NormalizeError> {
    let invalid = || NormalizeError::new(ErrorCode::InvalidNumber, "expected a whole number");
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(invalid),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

pub fn decimal(value: &Value) -> Result<f64, NormalizeError> {
    let invalid = || NormalizeError::new(ErrorCode::InvalidNumber, "expected a number");
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(invalid),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// A positive primary key.
pub fn id(value: &Value) -> Result<DbId, NormalizeError> {
    let id = integer(value)?;
    if id <= 0 {
        return Err(NormalizeError::new(
            ErrorCode::OutOfRange,
            "ids must be positive",
        ));
    }
    Ok(id)
}

/// A list of ids, given as a JSON array or as text separated by `,`, `;`
/// or `|`.
pub fn id_list(value: &Value) -> Result<Vec<DbId>, NormalizeError> {
    match value {
        Value::Array(items) => items.iter().map(id).collect(),
        Value::String(s) => s
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| id(&Value::String(part.to_string())))
            .collect(),
        Value::Number(_) => Ok(vec![id(value)?]),
        _ => Err(NormalizeError::new(
            ErrorCode::InvalidNumber,
            "expected a list of ids",
        )),
    }
}

/// A value parsed through [`std::str::FromStr`], reported as an invalid choice.
pub fn choice<T>(value: &Value) -> Result<T, NormalizeError>
where
    T: std::str::FromStr<Err = String>,
{
    as_text(value)?
        .parse::<T>()
        .map_err(|reason| NormalizeError::new(ErrorCode::InvalidChoice, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn blank_and_null_count_as_absent() {
        let r = raw(json!({"a": "", "b": null, "c": "  ", "d": "x"}));
        let f = Fields::new(&r);
        assert!(f.present("a").is_none());
        assert!(f.present("b").is_none());
        assert!(f.present("c").is_none());
        assert!(f.present("missing").is_none());
        assert!(f.present("d").is_some());
    }

    #[test]
    fn errors_are_collected_not_short_circuited() {
        let r = raw(json!({"phone": "nope", "email": "also nope"}));
        let mut f = Fields::new(&r);
        let name = f.required("name", text(10));
        let phone = f.required("phone", phone);
        let email = f.optional("email", email(100));
        assert!(name.is_none() && phone.is_none() && email.is_none());

        let errors = f.finish().unwrap_err();
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![ErrorCode::Required, ErrorCode::InvalidPhone, ErrorCode::InvalidEmail]
        );
        assert_eq!(errors[1].raw_value.as_deref(), Some("nope"));
    }

    #[test]
    fn optional_absent_is_not_an_error() {
        let r = raw(json!({}));
        let mut f = Fields::new(&r);
        assert!(f.optional("nationality", text(50)).is_none());
        assert!(f.finish().is_ok());
    }

    #[test]
    fn optional_any_uses_first_present_column() {
        let r = raw(json!({"id": "", "book_id": "12"}));
        let mut f = Fields::new(&r);
        assert_eq!(f.optional_any(&["id", "book_id"], id), Some(12));
    }

    #[test]
    fn text_length_counts_characters() {
        assert!(text(3)(&json!("héé")).is_ok());
        assert_eq!(text(3)(&json!("abcd")).unwrap_err().code, ErrorCode::TooLong);
    }

    #[test]
    fn integers_accept_numeric_text() {
        assert_eq!(integer(&json!("7")).unwrap(), 7);
        assert_eq!(integer(&json!("3.0")).unwrap(), 3);
        assert_eq!(integer(&json!(4)).unwrap(), 4);
        assert!(integer(&json!("3.5")).is_err());
        assert!(integer(&json!("three")).is_err());
    }

    #[test]
    fn id_lists_accept_arrays_and_separated_text() {
        assert_eq!(id_list(&json!([1, "2"])).unwrap(), vec![1, 2]);
        assert_eq!(id_list(&json!("4; 5|6,7")).unwrap(), vec![4, 5, 6, 7]);
        assert!(id_list(&json!("1;x")).is_err());
        assert!(id(&json!(0)).is_err());
    }
}
