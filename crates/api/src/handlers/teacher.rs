//! Handlers for the teacher dashboard (`/teacher`).
//!
//! Every handler is teacher-only and scoped to the caller's active session.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use easel_core::credentials;
use easel_core::error::CoreError;
use easel_core::types::{DbId, Timestamp};
use easel_db::models::chat::ChatMessage;
use easel_db::models::session::Session;
use easel_db::models::student::{CreateStudent, Student, StudentActivity};
use easel_db::models::submission::SubmissionWithOwner;
use easel_db::repositories::{ChatRepo, SessionRepo, StudentRepo, SubmissionRepo};
use serde::{Deserialize, Serialize};

use crate::auth::password::hash_password;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::handlers::chat::ThreadView;
use crate::middleware::rbac::RequireTeacher;
use crate::response::DataResponse;
use crate::state::AppState;

const USERNAME_CONSTRAINT: &str = "uq_students_session_username";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /teacher/credentials`.
#[derive(Debug, Deserialize)]
pub struct GenerateCredentialsRequest {
    pub count: usize,
}

/// A freshly created student login. The password is only ever returned here.
#[derive(Debug, Serialize)]
pub struct GeneratedCredential {
    pub student_id: DbId,
    pub username: String,
    pub password: String,
}

/// Session-wide totals for the dashboard header.
#[derive(Debug, Default, Serialize)]
pub struct ActivityTotals {
    pub students: usize,
    pub submissions: i64,
    pub successes: i64,
    pub errors: i64,
    pub shared: i64,
    pub threads: i64,
    pub messages: i64,
}

impl ActivityTotals {
    fn from_students(rows: &[StudentActivity]) -> Self {
        rows.iter().fold(
            ActivityTotals {
                students: rows.len(),
                ..Default::default()
            },
            |mut acc, row| {
                acc.submissions += row.submission_count;
                acc.successes += row.success_count;
                acc.errors += row.error_count;
                acc.shared += row.shared_count;
                acc.threads += row.thread_count;
                acc.messages += row.message_count;
                acc
            },
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityReport {
    pub session_id: DbId,
    pub totals: ActivityTotals,
    pub students: Vec<StudentActivity>,
}

/// Downloadable snapshot of a session.
#[derive(Debug, Serialize)]
pub struct SessionExport {
    pub exported_at: Timestamp,
    pub session: Session,
    pub students: Vec<Student>,
    pub submissions: Vec<SubmissionWithOwner>,
    pub chats: Vec<ThreadView>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/teacher/activity
pub async fn activity(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ActivityReport>>> {
    let students = StudentRepo::activity_for_session(&state.pool, caller.session_id).await?;
    Ok(Json(DataResponse {
        data: ActivityReport {
            session_id: caller.session_id,
            totals: ActivityTotals::from_students(&students),
            students,
        },
    }))
}

/// GET /api/v1/teacher/export
///
/// JSON attachment with the session, its students, submissions and chats.
pub async fn export(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let session = SessionRepo::find_by_id(&state.pool, caller.session_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Session",
            id: caller.session_id,
        })?;

    let students = StudentRepo::list_by_session(&state.pool, session.id).await?;
    let submissions = SubmissionRepo::list_by_session(&state.pool, session.id).await?;
    let chats = ChatRepo::list_for_session(&state.pool, session.id)
        .await?
        .into_iter()
        .map(ThreadView::from_summary)
        .collect::<AppResult<Vec<_>>>()?;

    tracing::info!(
        session_id = session.id,
        submissions = submissions.len(),
        "Session exported"
    );

    let disposition = format!("attachment; filename=\"session-{}-export.json\"", session.id);
    let body = DataResponse {
        data: SessionExport {
            exported_at: chrono::Utc::now(),
            session,
            students,
            submissions,
            chats,
        },
    };

    Ok((
        [
            (CONTENT_TYPE, "application/json".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        Json(body),
    )
        .into_response())
}

/// POST /api/v1/teacher/credentials
///
/// Create `count` students with generated usernames and passwords.
pub async fn generate_credentials(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
    Json(input): Json<GenerateCredentialsRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Vec<GeneratedCredential>>>)> {
    credentials::validate_credential_count(input.count)?;

    let mut created = Vec::with_capacity(input.count);
    for _ in 0..input.count {
        created.push(create_student(&state, caller.session_id).await?);
    }

    tracing::info!(
        session_id = caller.session_id,
        count = created.len(),
        "Student credentials generated"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/teacher/students
pub async fn list_students(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Student>>>> {
    let students = StudentRepo::list_by_session(&state.pool, caller.session_id).await?;
    Ok(Json(DataResponse { data: students }))
}

/// GET /api/v1/teacher/chats
pub async fn list_chats(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ThreadView>>>> {
    let data = ChatRepo::list_for_session(&state.pool, caller.session_id)
        .await?
        .into_iter()
        .map(ThreadView::from_summary)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/teacher/chats/{id}/messages
pub async fn chat_messages(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
    Path(thread_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ChatMessage>>>> {
    let thread = ChatRepo::find_thread(&state.pool, thread_id)
        .await?
        .filter(|t| t.session_id == caller.session_id)
        .ok_or(CoreError::NotFound {
            entity: "ChatThread",
            id: thread_id,
        })?;
    let messages = ChatRepo::list_messages(&state.pool, thread.id).await?;
    Ok(Json(DataResponse { data: messages }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert one generated student, retrying on username collisions.
async fn create_student(state: &AppState, session_id: DbId) -> AppResult<GeneratedCredential> {
    let password = credentials::generate_password(&mut rand::rng());
    let password_hash = hash_password(&password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    for attempt in 1..=credentials::MAX_USERNAME_ATTEMPTS {
        let username = credentials::generate_username(&mut rand::rng());
        let input = CreateStudent {
            session_id,
            username,
            password_hash: password_hash.clone(),
        };

        match StudentRepo::create(&state.pool, &input).await {
            Ok(student) => {
                return Ok(GeneratedCredential {
                    student_id: student.id,
                    username: student.username,
                    password,
                });
            }
            Err(err) if is_unique_violation(&err, USERNAME_CONSTRAINT) => {
                tracing::debug!(attempt, username = %input.username, "Username taken, retrying");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::Core(CoreError::Conflict(
        "Could not find a free username; try a smaller batch".into(),
    )))
}
