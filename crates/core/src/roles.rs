//! Well-known role names.
//!
//! The same strings are stored in `prompt_submissions.role` and carried in the
//! role cookie, so they must match the `CHECK` constraints in the migrations.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_STUDENT: &str = "student";

/// Who is acting inside a classroom session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => ROLE_TEACHER,
            Role::Student => ROLE_STUDENT,
        }
    }

    /// Parse a role name, rejecting anything other than the two known roles.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            ROLE_TEACHER => Ok(Role::Teacher),
            ROLE_STUDENT => Ok(Role::Student),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }

    /// Upper-case label stored on prompt submissions (`TEACHER` / `STUDENT`).
    pub fn submission_label(self) -> &'static str {
        match self {
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
        }
    }
}
