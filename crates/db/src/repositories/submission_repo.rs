//! Repository for the `prompt_submissions` table.

use std::collections::HashMap;

use easel_core::error::CoreError;
use easel_core::lineage;
use easel_core::types::DbId;
use sqlx::PgPool;

use crate::models::submission::{CreateSubmission, PromptSubmission, SubmissionWithOwner};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, session_id, student_id, prompt, role, status, image_data, mime_type, \
    error_message, is_shared, revision_index, parent_submission_id, root_submission_id, \
    created_at, updated_at";

/// Same columns qualified for the owner join, plus the owner's username.
const OWNER_COLUMNS: &str = "s.id, s.session_id, s.student_id, s.prompt, s.role, s.status, \
    s.image_data, s.mime_type, s.error_message, s.is_shared, s.revision_index, \
    s.parent_submission_id, s.root_submission_id, s.created_at, s.updated_at, st.username";

/// Outcome of inserting a refinement into an existing chain.
#[derive(Debug)]
pub enum ChainInsert {
    Inserted(PromptSubmission),
    /// The chain had no capacity left; nothing was written.
    Rejected(CoreError),
}

/// Provides lineage-aware persistence for prompt submissions.
pub struct SubmissionRepo;

impl SubmissionRepo {
    // ── Creation ─────────────────────────────────────────────────────

    /// Insert a new chain root (`revision_index = 0`, no root id) as PENDING.
    pub async fn create_root(
        pool: &PgPool,
        input: &CreateSubmission,
    ) -> Result<PromptSubmission, sqlx::Error> {
        let query = format!(
            "INSERT INTO prompt_submissions (session_id, student_id, prompt, role, status, revision_index)
             VALUES ($1, $2, $3, $4, $5, 0)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptSubmission>(&query)
            .bind(input.session_id)
            .bind(input.student_id)
            .bind(&input.prompt)
            .bind(&input.role)
            .bind(lineage::STATUS_PENDING)
            .fetch_one(pool)
            .await
    }

    /// Insert a refinement into the chain rooted at `root_id`.
    ///
    /// The root row is locked for the duration of the transaction so that
    /// concurrent refinements of one chain count and insert one at a time;
    /// the live-member count therefore never exceeds
    /// [`lineage::MAX_CHAIN_MEMBERS`].
    pub async fn create_in_chain(
        pool: &PgPool,
        input: &CreateSubmission,
        root_id: DbId,
    ) -> Result<ChainInsert, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT id FROM prompt_submissions WHERE id = $1 FOR UPDATE")
            .bind(root_id)
            .fetch_optional(&mut *tx)
            .await?;

        let (live,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM prompt_submissions
             WHERE (id = $1 OR root_submission_id = $1)
               AND status = ANY($2)",
        )
        .bind(root_id)
        .bind(lineage::live_status_labels())
        .fetch_one(&mut *tx)
        .await?;

        let revision_index = match lineage::next_revision_index(live) {
            Ok(index) => index,
            Err(err) => {
                tx.rollback().await?;
                return Ok(ChainInsert::Rejected(err));
            }
        };

        let query = format!(
            "INSERT INTO prompt_submissions
                (session_id, student_id, prompt, role, status, revision_index,
                 parent_submission_id, root_submission_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let submission = sqlx::query_as::<_, PromptSubmission>(&query)
            .bind(input.session_id)
            .bind(input.student_id)
            .bind(&input.prompt)
            .bind(&input.role)
            .bind(lineage::STATUS_PENDING)
            .bind(revision_index)
            .bind(input.parent_submission_id)
            .bind(root_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ChainInsert::Inserted(submission))
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Find a submission by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PromptSubmission>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM prompt_submissions WHERE id = $1");
        sqlx::query_as::<_, PromptSubmission>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All submissions of a session, newest first (teacher view).
    pub async fn list_by_session(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<SubmissionWithOwner>, sqlx::Error> {
        let query = format!(
            "SELECT {OWNER_COLUMNS}
             FROM prompt_submissions s
             LEFT JOIN students st ON st.id = s.student_id
             WHERE s.session_id = $1
             ORDER BY s.created_at DESC, s.id DESC"
        );
        sqlx::query_as::<_, SubmissionWithOwner>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Successful submissions a student may see: shared ones and their own.
    ///
    /// With no `student_id` (joined but not logged in) only shared ones.
    pub async fn list_visible_to_student(
        pool: &PgPool,
        session_id: DbId,
        student_id: Option<DbId>,
    ) -> Result<Vec<SubmissionWithOwner>, sqlx::Error> {
        let query = format!(
            "SELECT {OWNER_COLUMNS}
             FROM prompt_submissions s
             LEFT JOIN students st ON st.id = s.student_id
             WHERE s.session_id = $1
               AND s.status = $3
               AND (s.is_shared OR s.student_id = $2)
             ORDER BY s.created_at DESC, s.id DESC"
        );
        sqlx::query_as::<_, SubmissionWithOwner>(&query)
            .bind(session_id)
            .bind(student_id)
            .bind(lineage::STATUS_SUCCESS)
            .fetch_all(pool)
            .await
    }

    /// Successful member count per chain in a session, keyed by chain root id.
    pub async fn chain_success_counts(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<HashMap<DbId, i64>, sqlx::Error> {
        let rows: Vec<(DbId, i64)> = sqlx::query_as(
            "SELECT COALESCE(root_submission_id, id) AS chain_id, COUNT(*)
             FROM prompt_submissions
             WHERE session_id = $1 AND status = $2
             GROUP BY 1",
        )
        .bind(session_id)
        .bind(lineage::STATUS_SUCCESS)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Successful member count for a single chain.
    pub async fn chain_success_count(pool: &PgPool, root_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM prompt_submissions
             WHERE (id = $1 OR root_submission_id = $1) AND status = $2",
        )
        .bind(root_id)
        .bind(lineage::STATUS_SUCCESS)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Pending or successful member count for a single chain.
    pub async fn chain_live_count(pool: &PgPool, root_id: DbId) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM prompt_submissions
             WHERE (id = $1 OR root_submission_id = $1) AND status = ANY($2)",
        )
        .bind(root_id)
        .bind(lineage::live_status_labels())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    // ── Status transitions ───────────────────────────────────────────

    /// Move a PENDING submission to SUCCESS with its image.
    ///
    /// Returns `None` if the row does not exist or is no longer pending.
    pub async fn mark_success(
        pool: &PgPool,
        id: DbId,
        image_data: &str,
        mime_type: &str,
    ) -> Result<Option<PromptSubmission>, sqlx::Error> {
        let query = format!(
            "UPDATE prompt_submissions
             SET status = $4, image_data = $2, mime_type = $3, updated_at = NOW()
             WHERE id = $1 AND status = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptSubmission>(&query)
            .bind(id)
            .bind(image_data)
            .bind(mime_type)
            .bind(lineage::STATUS_SUCCESS)
            .bind(lineage::STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Move a PENDING submission to ERROR with a message.
    ///
    /// Returns `None` if the row does not exist or is no longer pending.
    pub async fn mark_error(
        pool: &PgPool,
        id: DbId,
        message: &str,
    ) -> Result<Option<PromptSubmission>, sqlx::Error> {
        let query = format!(
            "UPDATE prompt_submissions
             SET status = $3, error_message = $2, updated_at = NOW()
             WHERE id = $1 AND status = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptSubmission>(&query)
            .bind(id)
            .bind(message)
            .bind(lineage::STATUS_ERROR)
            .bind(lineage::STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Set the shared flag on a successful submission.
    ///
    /// Returns `None` if the row does not exist or is not in SUCCESS.
    pub async fn set_shared(
        pool: &PgPool,
        id: DbId,
        shared: bool,
    ) -> Result<Option<PromptSubmission>, sqlx::Error> {
        let query = format!(
            "UPDATE prompt_submissions
             SET is_shared = $2, updated_at = NOW()
             WHERE id = $1 AND status = $3
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PromptSubmission>(&query)
            .bind(id)
            .bind(shared)
            .bind(lineage::STATUS_SUCCESS)
            .fetch_optional(pool)
            .await
    }
}
