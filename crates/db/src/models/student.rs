//! Student model, DTOs and dashboard aggregates.

use easel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `students` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Student {
    pub id: DbId,
    pub session_id: DbId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: Timestamp,
}

/// DTO for inserting a generated student.
pub struct CreateStudent {
    pub session_id: DbId,
    pub username: String,
    pub password_hash: String,
}

/// Per-student activity counters for the teacher dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StudentActivity {
    pub student_id: DbId,
    pub username: String,
    pub submission_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub shared_count: i64,
    pub thread_count: i64,
    pub message_count: i64,
    pub last_activity_at: Option<Timestamp>,
}
