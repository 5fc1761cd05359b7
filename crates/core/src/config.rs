//! Environment-variable configuration shared by the API server and the
//! ingest pipeline.

use std::str::FromStr;

use crate::catalog::CatalogConfig;
use crate::rules::DEFAULT_BORROW_LIMIT;
use crate::validation::DEFAULT_LOAN_PERIOD_DAYS;

/// A configuration variable that is set but cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is required")]
    Missing { var: &'static str },

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Value of `var`, or `None` when unset or blank.
pub fn env_opt(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn env_required(var: &'static str) -> Result<String, ConfigError> {
    env_opt(var).ok_or(ConfigError::Missing { var })
}

/// Parse `var` with [`FromStr`], falling back to `default` when unset.
pub fn env_parse<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(var) {
        None => Ok(default),
        Some(value) => parse_value(var, &value),
    }
}

/// Boolean flag: `1`, `true`, `yes` and `on` are true, anything else false.
pub fn env_flag(var: &str) -> bool {
    env_opt(var).is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn parse_value<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn positive(var: &'static str, value: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be positive".into(),
        });
    }
    Ok(value)
}

impl CatalogConfig {
    /// Load the admission rules' tunables from the environment.
    ///
    /// | Env Var            | Default    |
    /// |--------------------|------------|
    /// | `BORROW_LIMIT`     | `10`       |
    /// | `LOAN_PERIOD_DAYS` | `14`       |
    /// | `ISBN_POLICY`      | `checksum` |
    /// | `BOOK_REFERENCES`  | `strict`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let borrow_limit = positive("BORROW_LIMIT", env_parse("BORROW_LIMIT", DEFAULT_BORROW_LIMIT)?)?;
        let loan_period_days = positive(
            "LOAN_PERIOD_DAYS",
            env_parse("LOAN_PERIOD_DAYS", DEFAULT_LOAN_PERIOD_DAYS)?,
        )?;
        let defaults = CatalogConfig::default();

        Ok(Self {
            borrow_limit,
            loan_period_days,
            isbn_policy: env_parse("ISBN_POLICY", defaults.isbn_policy)?,
            book_references: env_parse("BOOK_REFERENCES", defaults.book_references)?,
        })
    }
}
