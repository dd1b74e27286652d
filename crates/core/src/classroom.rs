//! Classroom session rules: session password policy and teacher key checks.

use crate::error::CoreError;

/// Minimum length of the password a teacher picks when starting a session.
pub const MIN_SESSION_PASSWORD_LENGTH: usize = 4;

/// Maximum length of a session password.
pub const MAX_SESSION_PASSWORD_LENGTH: usize = 128;

/// Validate a new session password.
pub fn validate_session_password(password: &str) -> Result<(), CoreError> {
    let len = password.chars().count();
    if len < MIN_SESSION_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Session password must be at least {MIN_SESSION_PASSWORD_LENGTH} characters long"
        )));
    }
    if len > MAX_SESSION_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Session password must not exceed {MAX_SESSION_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Check a presented teacher key against the configured one.
///
/// When no key is configured every caller passes. When one is configured the
/// presented key must match exactly.
pub fn check_teacher_key(configured: Option<&str>, presented: Option<&str>) -> Result<(), CoreError> {
    match configured {
        None => Ok(()),
        Some(expected) if presented == Some(expected) => Ok(()),
        Some(_) => Err(CoreError::Unauthorized("Invalid teacher key".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_password_at_minimum() {
        assert!(validate_session_password("abcd").is_ok());
    }

    #[test]
    fn rejects_short_password() {
        let err = validate_session_password("abc").unwrap_err();
        assert!(err.to_string().contains("at least 4"));
    }

    #[test]
    fn rejects_overlong_password() {
        let long = "x".repeat(MAX_SESSION_PASSWORD_LENGTH + 1);
        assert!(validate_session_password(&long).is_err());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Three multi-byte characters are still too short.
        assert!(validate_session_password("äöü").is_err());
    }

    #[test]
    fn teacher_key_not_configured_allows_anything() {
        assert!(check_teacher_key(None, None).is_ok());
        assert!(check_teacher_key(None, Some("whatever")).is_ok());
    }

    #[test]
    fn teacher_key_must_match_exactly() {
        assert!(check_teacher_key(Some("k3y"), Some("k3y")).is_ok());
        assert!(check_teacher_key(Some("k3y"), Some("K3Y")).is_err());
        assert!(check_teacher_key(Some("k3y"), None).is_err());
    }
}
