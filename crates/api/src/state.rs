use std::sync::Arc;

use libris_core::catalog::Catalog;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: libris_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Admission rules every write goes through.
    pub catalog: Arc<Catalog>,
}

impl AppState {
    pub fn new(pool: libris_db::DbPool, config: ServerConfig) -> Self {
        let catalog = Catalog::new(config.catalog);
        Self {
            pool,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        }
    }
}
