//! Role-based access control extractors.
//!
//! Each extractor wraps [`Caller`] and rejects requests whose role does not
//! meet the requirement, before the handler body runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use easel_core::error::CoreError;
use easel_core::roles::Role;
use easel_core::types::DbId;

use super::auth::Caller;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `teacher` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn teacher_only(RequireTeacher(caller): RequireTeacher) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireTeacher(pub Caller);

impl FromRequestParts<AppState> for RequireTeacher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        if caller.role != Role::Teacher {
            return Err(AppError::Core(CoreError::Forbidden(
                "Teacher role required".into(),
            )));
        }
        Ok(RequireTeacher(caller))
    }
}

/// A caller known to be a logged-in student.
#[derive(Debug, Clone)]
pub struct StudentCaller {
    pub session_id: DbId,
    pub student_id: DbId,
    pub username: String,
}

/// Requires the `student` role with a resolved student. Rejects with 403
/// Forbidden otherwise.
pub struct RequireStudent(pub StudentCaller);

impl FromRequestParts<AppState> for RequireStudent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        match (caller.role, caller.student_id, caller.username) {
            (Role::Student, Some(student_id), Some(username)) => {
                Ok(RequireStudent(StudentCaller {
                    session_id: caller.session_id,
                    student_id,
                    username,
                }))
            }
            _ => Err(AppError::Core(CoreError::Forbidden(
                "Student login required".into(),
            ))),
        }
    }
}
