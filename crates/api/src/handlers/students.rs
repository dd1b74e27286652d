//! Handlers for the `/students` resource (login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use easel_core::error::CoreError;
use easel_core::roles::Role;
use easel_core::types::DbId;
use easel_db::repositories::{SessionRepo, StudentRepo};
use serde::{Deserialize, Serialize};

use crate::auth::cookies::{self, Identity, SetCookies};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /students/login`.
#[derive(Debug, Deserialize)]
pub struct StudentLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct StudentInfo {
    pub session_id: DbId,
    pub student_id: DbId,
    pub username: String,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

/// POST /api/v1/students/login
///
/// Authenticate a generated student against the active session.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<StudentLoginRequest>,
) -> AppResult<(SetCookies, Json<DataResponse<StudentInfo>>)> {
    // 1. Resolve the active session.
    let session = SessionRepo::find_active(&state.pool)
        .await?
        .ok_or(CoreError::NoActiveSession)?;

    // 2. Find the student; unknown usernames get the same message as bad passwords.
    let student = StudentRepo::find_by_username(&state.pool, session.id, input.username.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    // 3. Verify password.
    let password_valid = verify_password(&input.password, &student.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(invalid_credentials());
    }

    tracing::info!(
        session_id = session.id,
        student_id = student.id,
        "Student logged in"
    );

    let cookies = cookies::issue(
        &Identity {
            session_id: session.id,
            role: Role::Student,
            student_id: Some(student.id),
        },
        &state.config.cookies,
    )
    .map_err(|e| AppError::InternalError(format!("Cookie signing error: {e}")))?;

    Ok((
        cookies,
        Json(DataResponse {
            data: StudentInfo {
                session_id: session.id,
                student_id: student.id,
                username: student.username,
            },
        }),
    ))
}

/// POST /api/v1/students/logout
///
/// Clear all identity cookies. Always succeeds.
pub async fn logout(State(state): State<AppState>) -> (StatusCode, SetCookies) {
    (
        StatusCode::NO_CONTENT,
        cookies::clear_all(&state.config.cookies),
    )
}
