//! Chat thread limits and message validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Maximum number of threads a student may open within one session.
pub const MAX_THREADS_PER_STUDENT: i64 = 5;

/// Number of most recent messages sent to the model as context.
pub const HISTORY_WINDOW: i64 = 20;

pub const MAX_THREAD_TITLE_LENGTH: usize = 100;
pub const MAX_MESSAGE_LENGTH: usize = 4000;

pub const SENDER_STUDENT: &str = "STUDENT";
pub const SENDER_AI: &str = "AI";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sender {
    Student,
    Ai,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::Student => SENDER_STUDENT,
            Sender::Ai => SENDER_AI,
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            SENDER_STUDENT => Ok(Sender::Student),
            SENDER_AI => Ok(Sender::Ai),
            other => Err(CoreError::Internal(format!("Unknown message sender '{other}'"))),
        }
    }
}

/// Fail with [`CoreError::LimitExceeded`] once a student already has
/// [`MAX_THREADS_PER_STUDENT`] threads.
pub fn check_thread_capacity(existing: i64) -> Result<(), CoreError> {
    if existing >= MAX_THREADS_PER_STUDENT {
        return Err(CoreError::LimitExceeded(format!(
            "You can have at most {MAX_THREADS_PER_STUDENT} chats in a session"
        )));
    }
    Ok(())
}

/// Ordinal label given to a thread created without a title.
pub fn default_thread_title(ordinal: i64) -> String {
    format!("Chat {ordinal}")
}

/// Validate an optional thread title. Blank titles become `None` so the
/// caller falls back to [`default_thread_title`].
pub fn validate_thread_title(title: Option<&str>) -> Result<Option<String>, CoreError> {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(None),
        Some(t) if t.chars().count() > MAX_THREAD_TITLE_LENGTH => Err(CoreError::Validation(
            format!("Chat title must not exceed {MAX_THREAD_TITLE_LENGTH} characters"),
        )),
        Some(t) => Ok(Some(t.to_string())),
    }
}

/// Validate message content and return it trimmed.
pub fn validate_message(content: &str) -> Result<&str, CoreError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Message must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Message must not exceed {MAX_MESSAGE_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}

/// A thread needs a reply when its newest message came from the student.
pub fn needs_reply(last_sender: Option<Sender>) -> bool {
    last_sender == Some(Sender::Student)
}
