//! Prompt submission model and DTOs.

use easel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `prompt_submissions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromptSubmission {
    pub id: DbId,
    pub session_id: DbId,
    pub student_id: Option<DbId>,
    pub prompt: String,
    pub role: String,
    pub status: String,
    pub image_data: Option<String>,
    pub mime_type: Option<String>,
    pub error_message: Option<String>,
    pub is_shared: bool,
    pub revision_index: i32,
    pub parent_submission_id: Option<DbId>,
    pub root_submission_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PromptSubmission {
    /// Id shared by every member of this submission's chain.
    pub fn chain_id(&self) -> DbId {
        self.root_submission_id.unwrap_or(self.id)
    }
}

/// A submission joined with its owner's username (null for teacher rows).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubmissionWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub submission: PromptSubmission,
    pub username: Option<String>,
}

/// DTO for inserting a new pending submission.
///
/// `parent_submission_id` is `None` for a chain root; the repository assigns
/// `revision_index` and `root_submission_id`.
pub struct CreateSubmission {
    pub session_id: DbId,
    pub student_id: Option<DbId>,
    pub prompt: String,
    pub role: String,
    pub parent_submission_id: Option<DbId>,
}
