//! Route definitions for the `/submissions` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::submissions;
use crate::state::AppState;

/// Routes mounted at `/submissions`.
///
/// ```text
/// GET, POST  /              -> list, create
/// PUT        /{id}/share    -> set_shared (student)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(submissions::list).post(submissions::create))
        .route("/{id}/share", put(submissions::set_shared))
}
