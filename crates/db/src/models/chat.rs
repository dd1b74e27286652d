//! Chat thread and message models.

use easel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `chat_threads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatThread {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: DbId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A thread with message statistics, used for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ThreadSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub thread: ChatThread,
    pub username: String,
    pub message_count: i64,
    pub last_sender: Option<String>,
    pub last_message_at: Option<Timestamp>,
}

/// A row from the `chat_messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub thread_id: DbId,
    pub student_id: Option<DbId>,
    pub sender: String,
    pub content: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a message.
pub struct CreateChatMessage {
    pub thread_id: DbId,
    pub student_id: Option<DbId>,
    pub sender: String,
    pub content: String,
}
