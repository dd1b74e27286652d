//! Authorization extractors.
//!
//! - [`auth::Caller`] -- resolves the caller's identity cookies against the
//!   active session.
//! - [`rbac::RequireTeacher`] -- requires the `teacher` role.
//! - [`rbac::RequireStudent`] -- requires a logged-in student.

pub mod auth;
pub mod rbac;
