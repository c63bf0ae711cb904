use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::SafeActionEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: remedian_db::DbPool,
    /// Server configuration (governance flags are read per request).
    pub config: Arc<ServerConfig>,
    /// The safe action orchestrator.
    pub engine: Arc<SafeActionEngine>,
}

impl AppState {
    /// Build state from configuration and a connected pool, wiring the
    /// engine from the governance section.
    pub fn new(pool: remedian_db::DbPool, config: ServerConfig) -> Self {
        let engine = Arc::new(SafeActionEngine::from_config(
            pool.clone(),
            &config.governance,
        ));
        Self {
            pool,
            config: Arc::new(config),
            engine,
        }
    }
}
