//! Field normalizers.
//!
//! Pure functions turning free-form input into canonical values: calendar
//! dates, E.164 phone numbers, title-cased names, bare ISBN digit strings
//! and lower-cased email addresses.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::ErrorCode;

/// Why a single value could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct NormalizeError {
    pub code: ErrorCode,
    pub reason: String,
}

impl NormalizeError {
    pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// A date that is either already typed or still text.
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Date(NaiveDate),
    Text(&'a str),
}

impl From<NaiveDate> for DateInput<'_> {
    fn from(date: NaiveDate) -> Self {
        DateInput::Date(date)
    }
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(text: &'a str) -> Self {
        DateInput::Text(text)
    }
}

/// Datetime layouts accepted as ISO-8601 without an offset.
const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Date-only layouts, tried in order after the ISO forms.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %B %Y", "%B %d, %Y", "%Y/%m/%d"];

/// Parse a date in any supported layout, truncated to day precision.
///
/// Order: ISO-8601 with offset, ISO-8601 without offset, `YYYY-MM-DD`,
/// `D Month YYYY`, `Month D, YYYY`, `YYYY/MM/DD`, bare `YYYY` (January 1st).
pub fn normalize_date<'a>(value: impl Into<DateInput<'a>>) -> Result<NaiveDate, NormalizeError> {
    let text = match value.into() {
        DateInput::Date(date) => return Ok(date),
        DateInput::Text(text) => text.trim(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }
    for format in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(dt.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Ok(date);
        }
    }
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(date) = text
            .parse::<i32>()
            .ok()
            .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        {
            return Ok(date);
        }
    }

    Err(NormalizeError::new(
        ErrorCode::InvalidDate,
        format!("unrecognized date '{text}'"),
    ))
}

// ---------------------------------------------------------------------------
// Phone numbers
// ---------------------------------------------------------------------------

/// Parse an international phone number and return its E.164 form.
///
/// No default region is assumed, so the input must carry its country code.
pub fn normalize_phone(value: &str) -> Result<String, NormalizeError> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.' | '/' | '\t'))
        .collect();

    let number = phonenumber::parse(None, &cleaned).map_err(|e| {
        NormalizeError::new(
            ErrorCode::InvalidPhone,
            format!("cannot parse phone number: {e}"),
        )
    })?;

    if !phonenumber::is_valid(&number) {
        return Err(NormalizeError::new(
            ErrorCode::InvalidPhone,
            "not a valid phone number",
        ));
    }

    Ok(number.format().mode(phonenumber::Mode::E164).to_string())
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s'\-]+$").expect("valid regex"));

/// Trim, collapse inner whitespace and title-case a personal name.
///
/// A letter is upper-cased when it follows a non-letter (start, space,
/// hyphen, apostrophe) and lower-cased otherwise, so `o'BRIEN` becomes
/// `O'Brien` and normalizing twice is a no-op.
pub fn normalize_name(value: &str) -> Result<String, NormalizeError> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return Err(NormalizeError::new(ErrorCode::Required, "name is empty"));
    }
    if !NAME_PATTERN.is_match(&collapsed) || !collapsed.chars().any(char::is_alphabetic) {
        return Err(NormalizeError::new(
            ErrorCode::InvalidName,
            "only letters, spaces, hyphens and apostrophes are allowed",
        ));
    }

    let mut out = String::with_capacity(collapsed.len());
    let mut after_letter = false;
    for c in collapsed.chars() {
        if c.is_alphabetic() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(c);
            after_letter = false;
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// ISBN
// ---------------------------------------------------------------------------

/// How strictly ISBNs are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsbnPolicy {
    /// Length, prefix and check digit.
    #[default]
    Checksum,
    /// Length and 978/979 prefix only.
    PrefixOnly,
}

impl std::str::FromStr for IsbnPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checksum" => Ok(IsbnPolicy::Checksum),
            "prefix" | "prefix_only" => Ok(IsbnPolicy::PrefixOnly),
            other => Err(format!("unknown ISBN policy '{other}'")),
        }
    }
}

/// Strip hyphens and spaces and check an ISBN-10 or ISBN-13.
///
/// An ISBN-10 may end in `X` (value 10); it is returned upper-cased.
pub fn normalize_isbn(value: &str, policy: IsbnPolicy) -> Result<String, NormalizeError> {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let invalid = |reason: &str| NormalizeError::new(ErrorCode::InvalidIsbn, reason);

    if !digits.is_ascii() {
        return Err(invalid("ISBN must contain only digits"));
    }

    match digits.len() {
        10 => {
            let (body, check) = digits.split_at(9);
            if !body.bytes().all(|b| b.is_ascii_digit())
                || !(check == "X" || check.bytes().all(|b| b.is_ascii_digit()))
            {
                return Err(invalid("ISBN-10 must be 9 digits followed by a digit or X"));
            }
            if policy == IsbnPolicy::Checksum && !isbn10_checksum_ok(&digits) {
                return Err(invalid("ISBN-10 check digit does not match"));
            }
        }
        13 => {
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid("ISBN-13 must contain only digits"));
            }
            if !(digits.starts_with("978") || digits.starts_with("979")) {
                return Err(invalid("ISBN-13 must start with 978 or 979"));
            }
            if policy == IsbnPolicy::Checksum && !isbn13_checksum_ok(&digits) {
                return Err(invalid("ISBN-13 check digit does not match"));
            }
        }
        _ => return Err(invalid("ISBN must have 10 or 13 digits")),
    }

    Ok(digits)
}

/// Weights 10 down to 1, sum divisible by 11.
fn isbn10_checksum_ok(isbn: &str) -> bool {
    let sum: u32 = isbn
        .chars()
        .zip((1..=10).rev())
        .map(|(c, weight)| {
            let value = if c == 'X' { 10 } else { c.to_digit(10).unwrap_or(0) };
            value * weight
        })
        .sum();
    sum % 11 == 0
}

/// Alternating weights 1 and 3, sum divisible by 10.
fn isbn13_checksum_ok(isbn: &str) -> bool {
    let sum: u32 = isbn
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    sum % 10 == 0
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// Trim and lower-case an email address, then check its form.
pub fn normalize_email(value: &str) -> Result<String, NormalizeError> {
    let email = value.trim().to_lowercase();
    if !email.validate_email() {
        return Err(NormalizeError::new(
            ErrorCode::InvalidEmail,
            format!("'{email}' is not a valid email address"),
        ));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -- dates --

    #[test]
    fn every_date_layout_yields_the_same_day() {
        for input in [
            "1984-01-02",
            "2 January 1984",
            "January 2, 1984",
            "1984/01/02",
            "1984-01-02T15:30:00",
            "1984-01-02 08:00:00.250",
            "1984-01-02T23:15:00+05:30",
        ] {
            assert_eq!(normalize_date(input).unwrap(), ymd(1984, 1, 2), "input {input}");
        }
    }

    #[test]
    fn bare_year_is_first_of_january() {
        assert_eq!(normalize_date("1843").unwrap(), ymd(1843, 1, 1));
    }

    #[test]
    fn typed_date_passes_through() {
        assert_eq!(normalize_date(ymd(2001, 9, 9)).unwrap(), ymd(2001, 9, 9));
    }

    #[test]
    fn single_digit_day_with_month_name() {
        assert_eq!(normalize_date("7 February 1812").unwrap(), ymd(1812, 2, 7));
    }

    #[test]
    fn garbage_date_is_rejected() {
        let err = normalize_date("next tuesday").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDate);
        assert!(normalize_date("1984-13-40").is_err());
        assert!(normalize_date("84").is_err());
    }

    // -- phones --

    #[test]
    fn phone_is_returned_in_e164() {
        assert_eq!(normalize_phone("+1 (650) 253-0000").unwrap(), "+16502530000");
        assert_eq!(normalize_phone("+1.650.253.0000").unwrap(), "+16502530000");
    }

    #[test]
    fn phone_without_country_code_is_rejected() {
        let err = normalize_phone("650 253 0000").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPhone);
    }

    #[test]
    fn phone_that_parses_but_is_invalid_is_rejected() {
        assert!(normalize_phone("+1 123").is_err());
        assert!(normalize_phone("call me").is_err());
    }

    // -- names --

    #[test]
    fn name_is_trimmed_and_title_cased() {
        assert_eq!(normalize_name(" jane ").unwrap(), "Jane");
        assert_eq!(normalize_name("o'BRIEN").unwrap(), "O'Brien");
        assert_eq!(normalize_name("mary-jane   watson").unwrap(), "Mary-Jane Watson");
    }

    #[test]
    fn name_normalization_is_idempotent() {
        let once = normalize_name("  de la  CRUZ ").unwrap();
        assert_eq!(normalize_name(&once).unwrap(), once);
    }

    #[test]
    fn name_with_digits_is_rejected() {
        let err = normalize_name("R2D2").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidName);
        assert!(normalize_name("--").is_err());
    }

    // -- isbn --

    #[test]
    fn isbn13_with_hyphens_is_stripped() {
        assert_eq!(
            normalize_isbn("978-0-13-468599-1", IsbnPolicy::Checksum).unwrap(),
            "9780134685991"
        );
    }

    #[test]
    fn isbn10_checksum_including_x() {
        assert_eq!(
            normalize_isbn("0-306-40615-2", IsbnPolicy::Checksum).unwrap(),
            "0306406152"
        );
        assert_eq!(
            normalize_isbn("0 8044 2957 x", IsbnPolicy::Checksum).unwrap(),
            "080442957X"
        );
    }

    #[test]
    fn bad_check_digit_depends_on_policy() {
        let err = normalize_isbn("978-0-13-468599-2", IsbnPolicy::Checksum).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidIsbn);
        assert_eq!(
            normalize_isbn("978-0-13-468599-2", IsbnPolicy::PrefixOnly).unwrap(),
            "9780134685992"
        );
    }

    #[test]
    fn isbn13_requires_bookland_prefix() {
        assert!(normalize_isbn("9770134685991", IsbnPolicy::PrefixOnly).is_err());
    }

    #[test]
    fn isbn_length_and_characters() {
        assert!(normalize_isbn("12345", IsbnPolicy::PrefixOnly).is_err());
        assert!(normalize_isbn("97801346859AB", IsbnPolicy::PrefixOnly).is_err());
        assert!(normalize_isbn("X306406152", IsbnPolicy::PrefixOnly).is_err());
    }

    #[test]
    fn isbn_policy_from_str() {
        assert_eq!("prefix".parse::<IsbnPolicy>().unwrap(), IsbnPolicy::PrefixOnly);
        assert_eq!("Checksum".parse::<IsbnPolicy>().unwrap(), IsbnPolicy::Checksum);
        assert!("loose".parse::<IsbnPolicy>().is_err());
    }

    // -- email --

    #[test]
    fn email_is_lower_cased() {
        assert_eq!(
            normalize_email("  Ada.Lovelace@Example.COM ").unwrap(),
            "ada.lovelace@example.com"
        );
        assert_eq!(
            normalize_email("not-an-email").unwrap_err().code,
            ErrorCode::InvalidEmail
        );
    }
}
