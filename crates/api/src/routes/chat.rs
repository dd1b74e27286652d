//! Route definitions for the `/chat` resource (students only).

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;

/// Routes mounted at `/chat`.
///
/// ```text
/// GET, POST  /threads                  -> list_threads, create_thread
/// GET, POST  /threads/{id}/messages    -> list_messages, post_message
/// POST       /threads/{id}/retry       -> retry_reply
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/threads", get(chat::list_threads).post(chat::create_thread))
        .route(
            "/threads/{id}/messages",
            get(chat::list_messages).post(chat::post_message),
        )
        .route("/threads/{id}/retry", post(chat::retry_reply))
}
