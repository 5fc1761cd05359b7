use std::path::PathBuf;

use libris_core::catalog::CatalogConfig;
use libris_core::config::{env_flag, env_opt, env_parse, env_required, ConfigError};
use libris_core::types::DbId;
use libris_openlibrary::DEFAULT_BASE_URL;

use crate::openlibrary_import::AuthorImport;

/// Where records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    /// A directory of `<table>.csv` files.
    Csv { dir: PathBuf },
    /// One author's works from Open Library.
    OpenLibrary {
        base_url: String,
        import: AuthorImport,
    },
}

/// Ingest configuration loaded from environment variables.
///
/// | Env Var                  | Default                   |
/// |--------------------------|---------------------------|
/// | `INGEST_SOURCE`          | `csv`                     |
/// | `INGEST_DIR`             | `data`                    |
/// | `OPENLIBRARY_AUTHOR`     | required for `openlibrary`|
/// | `OPENLIBRARY_LIMIT`      | `10`                      |
/// | `OPENLIBRARY_LIBRARY_ID` | required for `openlibrary`|
/// | `OPENLIBRARY_COPIES`     | `1`                       |
/// | `OPENLIBRARY_BASE_URL`   | `https://openlibrary.org` |
/// | `DRY_RUN`                | `false`                   |
/// | `DATABASE_URL`           | required unless dry run   |
///
/// The catalog rules are read by [`CatalogConfig::from_env`].
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub source: IngestSource,
    pub dry_run: bool,
    pub database_url: Option<String>,
    pub catalog: CatalogConfig,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let dry_run = env_flag("DRY_RUN");
        let database_url = if dry_run {
            env_opt("DATABASE_URL")
        } else {
            Some(env_required("DATABASE_URL")?)
        };

        let source = match env_opt("INGEST_SOURCE").as_deref().unwrap_or("csv") {
            "csv" => IngestSource::Csv {
                dir: PathBuf::from(env_opt("INGEST_DIR").unwrap_or_else(|| "data".into())),
            },
            "openlibrary" => IngestSource::OpenLibrary {
                base_url: env_opt("OPENLIBRARY_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                import: AuthorImport {
                    author: env_required("OPENLIBRARY_AUTHOR")?,
                    limit: env_parse("OPENLIBRARY_LIMIT", 10usize)?,
                    library_id: env_parse::<DbId>("OPENLIBRARY_LIBRARY_ID", 0)
                        .and_then(|id| require_id("OPENLIBRARY_LIBRARY_ID", id))?,
                    copies: env_parse("OPENLIBRARY_COPIES", 1i32)?,
                },
            },
            other => {
                return Err(ConfigError::Invalid {
                    var: "INGEST_SOURCE",
                    value: other.to_string(),
                    reason: "expected 'csv' or 'openlibrary'".into(),
                })
            }
        };

        Ok(Self {
            source,
            dry_run,
            database_url,
            catalog: CatalogConfig::from_env()?,
        })
    }
}

fn require_id(var: &'static str, id: DbId) -> Result<DbId, ConfigError> {
    if id <= 0 {
        return Err(ConfigError::Missing { var });
    }
    Ok(id)
}
