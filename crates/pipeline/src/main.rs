//! `libris-ingest` -- load library records into the catalog.
//!
//! Reads a directory of CSV files in dependency order, or imports one
//! author's works from Open Library. See [`IngestConfig`] for the
//! environment variables. `LOG_FORMAT=json` switches to JSON log lines.

use anyhow::Context;
use libris_core::catalog::Catalog;
use libris_core::store::memory::MemoryStore;
use libris_core::store::EntityStore;
use libris_db::PgStore;
use libris_openlibrary::OpenLibraryClient;
use libris_pipeline::config::{IngestConfig, IngestSource};
use libris_pipeline::ingest_directory;
use libris_pipeline::openlibrary_import::import_author_works;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = IngestConfig::from_env().context("invalid ingest configuration")?;
    let catalog = Catalog::new(config.catalog);

    if config.dry_run {
        tracing::info!("Dry run: validating against an in-memory store");
        let mut store = MemoryStore::new();
        return run(&config, &catalog, &mut store).await;
    }

    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required")?;
    let pool = libris_db::create_pool(database_url)
        .await
        .context("failed to connect to database")?;
    libris_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    libris_db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("Database ready");

    let mut store = PgStore::new(pool);
    run(&config, &catalog, &mut store).await
}

async fn run<S>(config: &IngestConfig, catalog: &Catalog, store: &mut S) -> anyhow::Result<()>
where
    S: EntityStore,
{
    match &config.source {
        IngestSource::Csv { dir } => {
            tracing::info!(dir = %dir.display(), "Ingesting CSV directory");
            let report = ingest_directory(catalog, store, dir).await;
            for batch in &report.batches {
                tracing::info!(
                    entity = %batch.entity,
                    valid = batch.summary.valid,
                    invalid = batch.summary.invalid,
                    success_rate = batch.summary.success_rate,
                    "Summary"
                );
            }
            if report.has_failures() {
                for failure in &report.failures {
                    tracing::error!(entity = %failure.entity, error = %failure.error, "Batch failed");
                }
                anyhow::bail!("{} batch(es) failed", report.failures.len());
            }
        }
        IngestSource::OpenLibrary { base_url, import } => {
            let client = OpenLibraryClient::new(base_url.as_str())?;
            let report = import_author_works(catalog, store, &client, import).await?;
            tracing::info!(
                author_id = report.author_id,
                author_created = report.author_created,
                already_present = report.already_present,
                valid = report.books.summary.valid,
                invalid = report.books.summary.invalid,
                "Open Library import complete"
            );
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "libris_ingest=info,libris_pipeline=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
