//! Handlers for the `/session` resource (start, join, end, current).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use easel_core::classroom;
use easel_core::error::CoreError;
use easel_core::roles::Role;
use easel_core::types::{DbId, Timestamp};
use easel_db::repositories::SessionRepo;
use serde::{Deserialize, Serialize};

use crate::auth::cookies::{self, Identity, SetCookies};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::resolve_caller;
use crate::middleware::rbac::RequireTeacher;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /session/start`.
#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub password: String,
    pub teacher_key: Option<String>,
}

/// Request body for `POST /session/join`.
#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    pub password: String,
    /// `"teacher"` or `"student"`.
    pub role: String,
    pub teacher_key: Option<String>,
}

/// Identity established by start / join.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: DbId,
    pub role: Role,
    pub created_at: Timestamp,
}

/// Response for `GET /session`.
#[derive(Debug, Serialize)]
pub struct CurrentSession {
    pub active: bool,
    pub session_id: Option<DbId>,
    pub created_at: Option<Timestamp>,
    /// The caller's role, when their cookies resolve against the active session.
    pub role: Option<Role>,
    pub student_id: Option<DbId>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionEnded {
    pub session_id: DbId,
    pub ended: bool,
}

fn issue_cookies(state: &AppState, identity: &Identity) -> AppResult<SetCookies> {
    cookies::issue(identity, &state.config.cookies)
        .map_err(|e| AppError::InternalError(format!("Cookie signing error: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/session/start
///
/// End any active session and open a new one; the caller becomes its teacher.
pub async fn start(
    State(state): State<AppState>,
    Json(input): Json<StartSessionRequest>,
) -> AppResult<(StatusCode, SetCookies, Json<DataResponse<SessionInfo>>)> {
    classroom::check_teacher_key(
        state.config.teacher_key.as_deref(),
        input.teacher_key.as_deref(),
    )?;
    classroom::validate_session_password(&input.password)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let session = SessionRepo::start(&state.pool, &password_hash).await?;
    tracing::info!(session_id = session.id, "Session started");

    let cookies = issue_cookies(
        &state,
        &Identity {
            session_id: session.id,
            role: Role::Teacher,
            student_id: None,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        cookies,
        Json(DataResponse {
            data: SessionInfo {
                session_id: session.id,
                role: Role::Teacher,
                created_at: session.created_at,
            },
        }),
    ))
}

/// POST /api/v1/session/join
///
/// Join the active session with its password as teacher or student. Students
/// finish identifying through `POST /students/login`.
pub async fn join(
    State(state): State<AppState>,
    Json(input): Json<JoinSessionRequest>,
) -> AppResult<(SetCookies, Json<DataResponse<SessionInfo>>)> {
    let role = Role::parse(&input.role)?;

    let session = SessionRepo::find_active(&state.pool)
        .await?
        .ok_or(CoreError::NoActiveSession)?;

    let password_valid = verify_password(&input.password, &session.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid session password".into(),
        )));
    }

    if role == Role::Teacher {
        classroom::check_teacher_key(
            state.config.teacher_key.as_deref(),
            input.teacher_key.as_deref(),
        )?;
    }

    tracing::info!(session_id = session.id, role = role.as_str(), "Joined session");

    let cookies = issue_cookies(
        &state,
        &Identity {
            session_id: session.id,
            role,
            student_id: None,
        },
    )?;

    Ok((
        cookies,
        Json(DataResponse {
            data: SessionInfo {
                session_id: session.id,
                role,
                created_at: session.created_at,
            },
        }),
    ))
}

/// POST /api/v1/session/end
///
/// End the caller's session (teacher only) and clear their cookies.
pub async fn end(
    RequireTeacher(caller): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<(SetCookies, Json<DataResponse<SessionEnded>>)> {
    let ended = SessionRepo::end(&state.pool, caller.session_id).await?;
    tracing::info!(session_id = caller.session_id, ended, "Session ended");

    Ok((
        cookies::clear_all(&state.config.cookies),
        Json(DataResponse {
            data: SessionEnded {
                session_id: caller.session_id,
                ended,
            },
        }),
    ))
}

/// GET /api/v1/session
///
/// Report the active session and, if the caller's cookies resolve, who they
/// are. Never fails for anonymous callers.
pub async fn current(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<CurrentSession>>> {
    let active = SessionRepo::find_active(&state.pool).await?;
    let caller = resolve_caller(&headers, &state).await?;

    let data = match active {
        None => CurrentSession {
            active: false,
            session_id: None,
            created_at: None,
            role: None,
            student_id: None,
            username: None,
        },
        Some(session) => {
            let caller = caller.filter(|c| c.session_id == session.id);
            CurrentSession {
                active: true,
                session_id: Some(session.id),
                created_at: Some(session.created_at),
                role: caller.as_ref().map(|c| c.role),
                student_id: caller.as_ref().and_then(|c| c.student_id),
                username: caller.and_then(|c| c.username),
            }
        }
    };

    Ok(Json(DataResponse { data }))
}
