//! Route definitions for the `/session` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Routes mounted at `/session`.
///
/// ```text
/// GET  /         -> current
/// POST /start    -> start
/// POST /join     -> join
/// POST /end      -> end (teacher)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(session::current))
        .route("/start", post(session::start))
        .route("/join", post(session::join))
        .route("/end", post(session::end))
}
