//! Handlers for the `/submissions` resource.
//!
//! Creating a submission records it as PENDING, calls the generation provider
//! and then moves it to SUCCESS or ERROR. Refinements join the parent's chain,
//! which holds at most three live members.
//!
//! Generation runs on its own task, so a request dropped by the timeout layer
//! or a disconnecting client still leaves the row finished.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use easel_core::error::CoreError;
use easel_core::lineage::{self, SubmissionStatus};
use easel_core::roles::Role;
use easel_core::types::DbId;
use easel_db::models::submission::{CreateSubmission, PromptSubmission, SubmissionWithOwner};
use easel_db::repositories::{ChainInsert, SubmissionRepo};
use easel_genai::{GeneratedImage, GenerationProvider};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::Caller;
use crate::middleware::rbac::RequireStudent;
use crate::response::DataResponse;
use crate::state::AppState;

/// Mime type recorded for legacy rows that have an image but no type.
const DEFAULT_MIME_TYPE: &str = "image/png";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /submissions`.
#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub prompt: String,
    /// Submission to refine; omitted for a new image.
    pub parent_submission_id: Option<DbId>,
}

/// Request body for `PUT /submissions/{id}/share`.
#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub shared: bool,
}

/// A submission with its owner and the refinements left in its chain.
#[derive(Debug, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: SubmissionWithOwner,
    pub remaining_edits: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/submissions
///
/// Teachers see every submission of the session; students see successful
/// ones that are shared or their own.
pub async fn list(
    caller: Caller,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<SubmissionView>>>> {
    let rows = if caller.is_teacher() {
        SubmissionRepo::list_by_session(&state.pool, caller.session_id).await?
    } else {
        SubmissionRepo::list_visible_to_student(&state.pool, caller.session_id, caller.student_id)
            .await?
    };

    let counts = SubmissionRepo::chain_success_counts(&state.pool, caller.session_id).await?;

    let data = rows
        .into_iter()
        .map(|row| {
            let successes = counts.get(&row.submission.chain_id()).copied().unwrap_or(0);
            SubmissionView {
                remaining_edits: lineage::remaining_edits(successes),
                submission: row,
            }
        })
        .collect();

    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/submissions
///
/// Create a new image or a refinement and generate it.
pub async fn create(
    caller: Caller,
    State(state): State<AppState>,
    Json(input): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmissionView>>)> {
    let prompt = lineage::validate_prompt(&input.prompt)?.to_string();

    if caller.role == Role::Student && caller.student_id.is_none() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Student login required".into(),
        )));
    }

    let new = CreateSubmission {
        session_id: caller.session_id,
        student_id: caller.student_id,
        prompt: prompt.clone(),
        role: caller.role.submission_label().to_string(),
        parent_submission_id: input.parent_submission_id,
    };

    // 1. Insert the pending row (root or chain member).
    let (pending, base_image) = match input.parent_submission_id {
        None => (SubmissionRepo::create_root(&state.pool, &new).await?, None),
        Some(parent_id) => {
            let parent = load_refinable_parent(&state, &caller, parent_id).await?;
            let root_id = lineage::chain_root(parent.id, parent.root_submission_id);

            match SubmissionRepo::create_in_chain(&state.pool, &new, root_id).await? {
                ChainInsert::Inserted(row) => (row, base_image_of(&parent)),
                ChainInsert::Rejected(err) => return Err(err.into()),
            }
        }
    };

    tracing::info!(
        submission_id = pending.id,
        session_id = pending.session_id,
        revision_index = pending.revision_index,
        "Submission created"
    );

    // 2. Generate and record the outcome on a detached task.
    let task = tokio::spawn(finish_submission(
        state.pool.clone(),
        Arc::clone(&state.generator),
        pending.id,
        prompt,
        base_image,
    ));
    let finished = task.await.map_err(|e| {
        AppError::InternalError(format!(
            "Generation task for submission {} failed: {e}",
            pending.id
        ))
    })??;

    let successes = SubmissionRepo::chain_success_count(&state.pool, finished.chain_id()).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmissionView {
                remaining_edits: lineage::remaining_edits(successes),
                submission: SubmissionWithOwner {
                    submission: finished,
                    username: caller.username,
                },
            },
        }),
    ))
}

/// Call the provider and move the PENDING row to SUCCESS or ERROR.
async fn finish_submission(
    pool: PgPool,
    generator: Arc<dyn GenerationProvider>,
    id: DbId,
    prompt: String,
    base_image: Option<GeneratedImage>,
) -> AppResult<PromptSubmission> {
    let finished = match generator.generate_image(&prompt, base_image.as_ref()).await {
        Ok(image) => {
            SubmissionRepo::mark_success(&pool, id, &image.data_base64, &image.mime_type).await?
        }
        Err(err) => {
            SubmissionRepo::mark_error(&pool, id, &err.to_string()).await?;
            tracing::warn!(submission_id = id, error = %err, "Submission failed");
            return Err(AppError::Generation(err));
        }
    };
    let finished = finished.ok_or_else(|| {
        AppError::InternalError(format!("Submission {id} left PENDING state concurrently"))
    })?;
    tracing::info!(submission_id = id, "Submission completed");
    Ok(finished)
}

/// PUT /api/v1/submissions/{id}/share
///
/// Toggle sharing on the caller's own successful submission.
pub async fn set_shared(
    RequireStudent(student): RequireStudent,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ShareRequest>,
) -> AppResult<Json<DataResponse<PromptSubmission>>> {
    let not_found = || CoreError::NotFound {
        entity: "Submission",
        id,
    };

    let submission = SubmissionRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|s| s.session_id == student.session_id)
        .ok_or_else(not_found)?;

    if submission.student_id != Some(student.student_id) {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only share your own images".into(),
        )));
    }

    let only_completed =
        || CoreError::Validation("Only completed images can be shared".into());
    if SubmissionStatus::parse(&submission.status)? != SubmissionStatus::Success {
        return Err(only_completed().into());
    }

    let updated = SubmissionRepo::set_shared(&state.pool, id, input.shared)
        .await?
        .ok_or_else(only_completed)?;

    tracing::info!(
        submission_id = id,
        student_id = student.student_id,
        shared = input.shared,
        "Submission sharing updated"
    );

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a parent submission and check the caller may refine it.
async fn load_refinable_parent(
    state: &AppState,
    caller: &Caller,
    parent_id: DbId,
) -> AppResult<PromptSubmission> {
    let parent = SubmissionRepo::find_by_id(&state.pool, parent_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Submission",
            id: parent_id,
        })?;

    let owns_parent = match caller.role {
        Role::Student => parent.student_id.is_some() && parent.student_id == caller.student_id,
        Role::Teacher => parent.role == Role::Teacher.submission_label(),
    };
    if parent.session_id != caller.session_id || !owns_parent {
        return Err(AppError::Core(CoreError::Forbidden(
            "You can only refine your own images".into(),
        )));
    }

    lineage::ensure_refinable(
        SubmissionStatus::parse(&parent.status)?,
        parent.image_data.is_some(),
    )?;

    Ok(parent)
}

fn base_image_of(parent: &PromptSubmission) -> Option<GeneratedImage> {
    parent.image_data.as_ref().map(|data| GeneratedImage {
        data_base64: data.clone(),
        mime_type: parent
            .mime_type
            .clone()
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
    })
}
