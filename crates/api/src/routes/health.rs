use axum::extract::State;
use axum::{routing::get, Json, Router};
use easel_db::repositories::SessionRepo;
use serde::Serialize;

use crate::state::AppState;

/// Payload of `GET /health`.
#[derive(Serialize)]
pub struct HealthReport {
    /// `ok`, or `degraded` when the database cannot be reached.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Whether a classroom session is currently running. `None` when the
    /// database is down.
    pub session_active: Option<bool>,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let db_healthy = easel_db::health_check(&state.pool).await.is_ok();
    let session_active = if db_healthy {
        SessionRepo::count_active(&state.pool)
            .await
            .ok()
            .map(|n| n > 0)
    } else {
        None
    };

    Json(HealthReport {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        session_active,
    })
}

/// Root-level health route, mounted outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
