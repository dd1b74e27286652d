//! Cookie-based caller extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use easel_core::error::CoreError;
use easel_core::roles::Role;
use easel_core::types::DbId;
use easel_db::repositories::{SessionRepo, StudentRepo};

use crate::auth::cookies::read_identity;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Caller resolved from identity cookies and checked against the database.
///
/// The session is guaranteed active and, when `student_id` is set, the
/// student is guaranteed to belong to it.
///
/// ```ignore
/// async fn my_handler(caller: Caller) -> AppResult<Json<()>> {
///     tracing::info!(session_id = caller.session_id, role = caller.role.as_str(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller {
    pub session_id: DbId,
    pub role: Role,
    pub student_id: Option<DbId>,
    /// Username of the logged-in student.
    pub username: Option<String>,
}

impl Caller {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }
}

/// Resolve the caller without failing for anonymous or stale cookies.
///
/// Returns `Ok(None)` when the cookies are missing or invalid, the session is
/// no longer active, or the student does not belong to the session.
pub async fn resolve_caller(headers: &HeaderMap, state: &AppState) -> AppResult<Option<Caller>> {
    let Some(identity) = read_identity(headers, &state.config.cookies) else {
        return Ok(None);
    };

    if SessionRepo::find_active_by_id(&state.pool, identity.session_id)
        .await?
        .is_none()
    {
        return Ok(None);
    }

    let username = match (identity.role, identity.student_id) {
        (Role::Student, Some(student_id)) => {
            match StudentRepo::find_in_session(&state.pool, student_id, identity.session_id).await? {
                Some(student) => Some(student.username),
                None => return Ok(None),
            }
        }
        _ => None,
    };

    Ok(Some(Caller {
        session_id: identity.session_id,
        role: identity.role,
        // A teacher never carries a student id.
        student_id: identity.student_id.filter(|_| identity.role == Role::Student),
        username,
    }))
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve_caller(&parts.headers, state).await?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Not signed in to an active session".into(),
            ))
        })
    }
}
