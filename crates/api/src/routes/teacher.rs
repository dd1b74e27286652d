//! Route definitions for the teacher dashboard.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::teacher;
use crate::state::AppState;

/// Routes mounted at `/teacher`. All require the teacher role.
///
/// ```text
/// GET  /activity              -> activity
/// GET  /export                -> export
/// POST /credentials           -> generate_credentials
/// GET  /students              -> list_students
/// GET  /chats                 -> list_chats
/// GET  /chats/{id}/messages   -> chat_messages
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/activity", get(teacher::activity))
        .route("/export", get(teacher::export))
        .route("/credentials", post(teacher::generate_credentials))
        .route("/students", get(teacher::list_students))
        .route("/chats", get(teacher::list_chats))
        .route("/chats/{id}/messages", get(teacher::chat_messages))
}
