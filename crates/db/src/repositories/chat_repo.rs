//! Repository for the `chat_threads` and `chat_messages` tables.

use easel_core::chat;
use easel_core::error::CoreError;
use easel_core::types::DbId;
use sqlx::PgPool;

use crate::models::chat::{ChatMessage, ChatThread, CreateChatMessage, ThreadSummary};

const THREAD_COLUMNS: &str = "id, session_id, student_id, title, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, thread_id, student_id, sender, content, created_at";

/// Thread listing with owner name, message count and the newest message.
const SUMMARY_SELECT: &str = "SELECT ct.id, ct.session_id, ct.student_id, ct.title,
            ct.created_at, ct.updated_at, st.username,
            (SELECT COUNT(*) FROM chat_messages cm WHERE cm.thread_id = ct.id) AS message_count,
            last.sender AS last_sender,
            last.created_at AS last_message_at
     FROM chat_threads ct
     JOIN students st ON st.id = ct.student_id
     LEFT JOIN LATERAL (
         SELECT sender, created_at FROM chat_messages
         WHERE thread_id = ct.id
         ORDER BY created_at DESC, id DESC
         LIMIT 1
     ) last ON true";

/// Outcome of creating a thread under the per-student cap.
#[derive(Debug)]
pub enum ThreadInsert {
    Created(ChatThread),
    /// The student already has the maximum number of threads.
    Rejected(CoreError),
}

/// Provides persistence for chat threads and their messages.
pub struct ChatRepo;

impl ChatRepo {
    // ── Threads ──────────────────────────────────────────────────────

    /// Create a thread for a student, enforcing
    /// [`chat::MAX_THREADS_PER_STUDENT`].
    ///
    /// The student row is locked while counting so two concurrent creates
    /// cannot both slip under the cap. A `None` title becomes the ordinal
    /// default (`Chat N`).
    pub async fn create_thread(
        pool: &PgPool,
        session_id: DbId,
        student_id: DbId,
        title: Option<String>,
    ) -> Result<ThreadInsert, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM students WHERE id = $1 FOR UPDATE")
            .bind(student_id)
            .fetch_optional(&mut *tx)
            .await?;

        let (existing,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM chat_threads WHERE session_id = $1 AND student_id = $2",
        )
        .bind(session_id)
        .bind(student_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Err(err) = chat::check_thread_capacity(existing) {
            tx.rollback().await?;
            return Ok(ThreadInsert::Rejected(err));
        }

        let title = title.unwrap_or_else(|| chat::default_thread_title(existing + 1));

        let query = format!(
            "INSERT INTO chat_threads (session_id, student_id, title)
             VALUES ($1, $2, $3)
             RETURNING {THREAD_COLUMNS}"
        );
        let thread = sqlx::query_as::<_, ChatThread>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(&title)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ThreadInsert::Created(thread))
    }

    /// Find a thread by id.
    pub async fn find_thread(pool: &PgPool, id: DbId) -> Result<Option<ChatThread>, sqlx::Error> {
        let query = format!("SELECT {THREAD_COLUMNS} FROM chat_threads WHERE id = $1");
        sqlx::query_as::<_, ChatThread>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A student's threads in a session, most recently updated first.
    pub async fn list_for_student(
        pool: &PgPool,
        session_id: DbId,
        student_id: DbId,
    ) -> Result<Vec<ThreadSummary>, sqlx::Error> {
        let query = format!(
            "{SUMMARY_SELECT}
             WHERE ct.session_id = $1 AND ct.student_id = $2
             ORDER BY ct.updated_at DESC, ct.id DESC"
        );
        sqlx::query_as::<_, ThreadSummary>(&query)
            .bind(session_id)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// Every thread in a session (teacher view).
    pub async fn list_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<ThreadSummary>, sqlx::Error> {
        let query = format!(
            "{SUMMARY_SELECT}
             WHERE ct.session_id = $1
             ORDER BY ct.updated_at DESC, ct.id DESC"
        );
        sqlx::query_as::<_, ThreadSummary>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Bump `updated_at` after a reply.
    pub async fn touch_thread(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE chat_threads SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Messages ─────────────────────────────────────────────────────

    /// Insert a message, returning the created row.
    pub async fn insert_message(
        pool: &PgPool,
        input: &CreateChatMessage,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages (thread_id, student_id, sender, content)
             VALUES ($1, $2, $3, $4)
             RETURNING {MESSAGE_COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(input.thread_id)
            .bind(input.student_id)
            .bind(&input.sender)
            .bind(&input.content)
            .fetch_one(pool)
            .await
    }

    /// All messages of a thread in chronological order.
    pub async fn list_messages(pool: &PgPool, thread_id: DbId) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE thread_id = $1
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(thread_id)
            .fetch_all(pool)
            .await
    }

    /// The newest `limit` messages of a thread, returned oldest first.
    pub async fn recent_messages(
        pool: &PgPool,
        thread_id: DbId,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM (
                 SELECT {MESSAGE_COLUMNS} FROM chat_messages
                 WHERE thread_id = $1
                 ORDER BY created_at DESC, id DESC
                 LIMIT $2
             ) recent
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(thread_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// The newest message of a thread, if any.
    pub async fn last_message(pool: &PgPool, thread_id: DbId) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE thread_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(thread_id)
            .fetch_optional(pool)
            .await
    }
}
