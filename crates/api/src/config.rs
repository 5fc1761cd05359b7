use axum::http::HeaderValue;
use libris_core::catalog::CatalogConfig;
use libris_core::config::{env_opt, env_parse, ConfigError};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<HeaderValue>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Admission rule tunables shared with the ingest pipeline.
    pub catalog: CatalogConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    ///
    /// plus the catalog variables read by [`CatalogConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_opt("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 3000)?;
        let cors_origins = parse_origins(
            &env_opt("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into()),
        )?;
        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            catalog: CatalogConfig::from_env()?,
        })
    }
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                var: "CORS_ORIGINS",
                value: origin.to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}
