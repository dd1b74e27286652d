//! Repository for the `students` table.

use easel_core::lineage;
use easel_core::types::DbId;
use sqlx::PgPool;

use crate::models::student::{CreateStudent, Student, StudentActivity};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, username, password_hash, created_at";

/// Provides the credential store for generated students.
pub struct StudentRepo;

impl StudentRepo {
    /// Insert a student. A duplicate username within the session fails with
    /// a unique violation on `uq_students_session_username`.
    pub async fn create(pool: &PgPool, input: &CreateStudent) -> Result<Student, sqlx::Error> {
        let query = format!(
            "INSERT INTO students (session_id, username, password_hash)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(input.session_id)
            .bind(&input.username)
            .bind(&input.password_hash)
            .fetch_one(pool)
            .await
    }

    /// Find a student by username within a session.
    pub async fn find_by_username(
        pool: &PgPool,
        session_id: DbId,
        username: &str,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM students WHERE session_id = $1 AND username = $2");
        sqlx::query_as::<_, Student>(&query)
            .bind(session_id)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Find a student only if it belongs to the given session.
    pub async fn find_in_session(
        pool: &PgPool,
        id: DbId,
        session_id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1 AND session_id = $2");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// List all students of a session, ordered by username.
    pub async fn list_by_session(pool: &PgPool, session_id: DbId) -> Result<Vec<Student>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM students WHERE session_id = $1 ORDER BY username");
        sqlx::query_as::<_, Student>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Per-student submission and chat counters for a session.
    pub async fn activity_for_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<StudentActivity>, sqlx::Error> {
        sqlx::query_as::<_, StudentActivity>(
            "SELECT st.id AS student_id,
                    st.username,
                    COALESCE(sub.total, 0) AS submission_count,
                    COALESCE(sub.success, 0) AS success_count,
                    COALESCE(sub.error, 0) AS error_count,
                    COALESCE(sub.shared, 0) AS shared_count,
                    (SELECT COUNT(*) FROM chat_threads ct WHERE ct.student_id = st.id) AS thread_count,
                    (SELECT COUNT(*) FROM chat_messages cm WHERE cm.student_id = st.id) AS message_count,
                    GREATEST(
                        sub.last_at,
                        (SELECT MAX(cm.created_at) FROM chat_messages cm WHERE cm.student_id = st.id)
                    ) AS last_activity_at
             FROM students st
             LEFT JOIN LATERAL (
                 SELECT COUNT(*) AS total,
                        COUNT(*) FILTER (WHERE ps.status = $2) AS success,
                        COUNT(*) FILTER (WHERE ps.status = $3) AS error,
                        COUNT(*) FILTER (WHERE ps.is_shared) AS shared,
                        MAX(ps.created_at) AS last_at
                 FROM prompt_submissions ps
                 WHERE ps.student_id = st.id
             ) sub ON true
             WHERE st.session_id = $1
             ORDER BY st.username",
        )
        .bind(session_id)
        .bind(lineage::STATUS_SUCCESS)
        .bind(lineage::STATUS_ERROR)
        .fetch_all(pool)
        .await
    }
}
