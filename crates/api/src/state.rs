use std::sync::Arc;

use easel_genai::GenerationProvider;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: easel_db::DbPool,
    /// Server configuration (cookie signing, teacher key).
    pub config: Arc<ServerConfig>,
    /// Remote image / chat generation.
    pub generator: Arc<dyn GenerationProvider>,
}
