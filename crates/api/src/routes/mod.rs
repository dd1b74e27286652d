pub mod chat;
pub mod health;
pub mod session;
pub mod students;
pub mod submissions;
pub mod teacher;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /session                                 current
/// /session/start                           start (becomes teacher)
/// /session/join                            join as teacher or student
/// /session/end                             end (teacher)
///
/// /students/login                          student login
/// /students/logout                         clear identity
///
/// /submissions                             list, create
/// /submissions/{id}/share                  toggle sharing (student)
///
/// /chat/threads                            list, create (student)
/// /chat/threads/{id}/messages              list, post (student)
/// /chat/threads/{id}/retry                 re-request a reply (student)
///
/// /teacher/activity                        per-student counters
/// /teacher/export                          JSON download
/// /teacher/credentials                     generate student logins
/// /teacher/students                        list students
/// /teacher/chats                           list all threads
/// /teacher/chats/{id}/messages             read a thread
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/session", session::router())
        .nest("/students", students::router())
        .nest("/submissions", submissions::router())
        .nest("/chat", chat::router())
        .nest("/teacher", teacher::router())
}
