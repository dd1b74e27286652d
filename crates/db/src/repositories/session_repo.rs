//! Repository for the `sessions` table.

use easel_core::types::DbId;
use sqlx::PgPool;

use crate::models::session::Session;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, password_hash, is_active, created_at, ended_at";

/// Lifecycle operations for classroom sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// End every active session and open a new one, atomically.
    ///
    /// The partial unique index `uq_sessions_single_active` backs this up: a
    /// concurrent `start` that commits first makes this insert fail with a
    /// unique violation instead of leaving two active rows.
    pub async fn start(pool: &PgPool, password_hash: &str) -> Result<Session, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let ended = sqlx::query(
            "UPDATE sessions SET is_active = false, ended_at = NOW() WHERE is_active = true",
        )
        .execute(&mut *tx)
        .await?;

        let query = format!(
            "INSERT INTO sessions (password_hash, is_active)
             VALUES ($1, true)
             RETURNING {COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&query)
            .bind(password_hash)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            session_id = session.id,
            ended = ended.rows_affected(),
            "Started session"
        );
        Ok(session)
    }

    /// The currently active session, if any.
    pub async fn find_active(pool: &PgPool) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE is_active = true");
        sqlx::query_as::<_, Session>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by id, but only while it is still active.
    pub async fn find_active_by_id(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by id regardless of state.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE id = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Mark a session as ended. Returns `true` if an active row was updated.
    pub async fn end(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = false, ended_at = NOW()
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of active sessions. Always 0 or 1.
    pub async fn count_active(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions WHERE is_active = true")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
