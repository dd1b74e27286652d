//! Signed identity cookies.
//!
//! A caller's identity is three http-only cookies: the session id, the role
//! and (for students) the student id. Each cookie value is an HS256 JWT whose
//! claims bind the cookie *name* and value, so a token minted for one cookie
//! cannot be replayed in another.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName};
use axum::response::AppendHeaders;
use easel_core::roles::Role;
use easel_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "easel_session";
pub const ROLE_COOKIE: &str = "easel_role";
pub const STUDENT_COOKIE: &str = "easel_student";

/// Default cookie lifetime in hours.
const DEFAULT_MAX_AGE_HOURS: i64 = 6;

/// `Set-Cookie` headers to attach to a response.
pub type SetCookies = AppendHeaders<Vec<(HeaderName, String)>>;

/// Claims carried by each cookie value.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CookieClaims {
    /// Cookie name the value was issued for.
    pub name: String,
    pub value: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

/// Configuration for signing and emitting identity cookies.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// HMAC-SHA256 secret used to sign cookie values.
    pub secret: String,
    /// Cookie and token lifetime in hours (default: 6).
    pub max_age_hours: i64,
    /// Add the `Secure` attribute (default: false for local HTTP).
    pub secure: bool,
}

impl CookieConfig {
    /// Load cookie configuration from environment variables.
    ///
    /// | Env Var                | Required | Default |
    /// |------------------------|----------|---------|
    /// | `COOKIE_SECRET`        | **yes**  | --      |
    /// | `COOKIE_MAX_AGE_HOURS` | no       | `6`     |
    /// | `COOKIE_SECURE`        | no       | `false` |
    ///
    /// # Panics
    ///
    /// Panics if `COOKIE_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("COOKIE_SECRET").expect("COOKIE_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "COOKIE_SECRET must not be empty");

        let max_age_hours: i64 = std::env::var("COOKIE_MAX_AGE_HOURS")
            .unwrap_or_else(|_| DEFAULT_MAX_AGE_HOURS.to_string())
            .parse()
            .expect("COOKIE_MAX_AGE_HOURS must be a valid i64");

        let secure = std::env::var("COOKIE_SECURE")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            secret,
            max_age_hours,
            secure,
        }
    }

    fn max_age_secs(&self) -> i64 {
        self.max_age_hours * 3600
    }
}

/// The identity carried by a caller's cookies, before it is checked against
/// the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub session_id: DbId,
    pub role: Role,
    pub student_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Sign `value` for the cookie called `name`.
pub fn sign_value(
    name: &str,
    value: &str,
    config: &CookieConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = CookieClaims {
        name: name.to_string(),
        value: value.to_string(),
        exp: now + config.max_age_secs(),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify a signed cookie value, returning the plain value when the
/// signature, expiry and bound cookie name all check out.
pub fn verify_value(name: &str, token: &str, config: &CookieConfig) -> Option<String> {
    let data = decode::<CookieClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    (data.claims.name == name).then_some(data.claims.value)
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

fn cookie_attributes(config: &CookieConfig, max_age: i64) -> String {
    let secure = if config.secure { "; Secure" } else { "" };
    format!("HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}")
}

fn set_cookie(name: &str, token: &str, config: &CookieConfig) -> (HeaderName, String) {
    (
        SET_COOKIE,
        format!("{name}={token}; {}", cookie_attributes(config, config.max_age_secs())),
    )
}

fn clear_cookie(name: &str, config: &CookieConfig) -> (HeaderName, String) {
    (
        SET_COOKIE,
        format!("{name}=; {}", cookie_attributes(config, 0)),
    )
}

/// `Set-Cookie` headers establishing `identity`. The student cookie is
/// cleared when the identity has no student.
pub fn issue(
    identity: &Identity,
    config: &CookieConfig,
) -> Result<SetCookies, jsonwebtoken::errors::Error> {
    let mut headers = vec![
        set_cookie(
            SESSION_COOKIE,
            &sign_value(SESSION_COOKIE, &identity.session_id.to_string(), config)?,
            config,
        ),
        set_cookie(
            ROLE_COOKIE,
            &sign_value(ROLE_COOKIE, identity.role.as_str(), config)?,
            config,
        ),
    ];
    headers.push(match identity.student_id {
        Some(id) => set_cookie(
            STUDENT_COOKIE,
            &sign_value(STUDENT_COOKIE, &id.to_string(), config)?,
            config,
        ),
        None => clear_cookie(STUDENT_COOKIE, config),
    });
    Ok(AppendHeaders(headers))
}

/// `Set-Cookie` headers clearing all identity cookies.
pub fn clear_all(config: &CookieConfig) -> SetCookies {
    AppendHeaders(
        [SESSION_COOKIE, ROLE_COOKIE, STUDENT_COOKIE]
            .into_iter()
            .map(|name| clear_cookie(name, config))
            .collect(),
    )
}

/// Raw value of a request cookie.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

fn read_signed(headers: &HeaderMap, name: &str, config: &CookieConfig) -> Option<String> {
    read_cookie(headers, name).and_then(|token| verify_value(name, token, config))
}

/// Decode the identity from request cookies.
///
/// Returns `None` unless both the session and role cookies verify. A
/// tampered or expired student cookie is treated as absent.
pub fn read_identity(headers: &HeaderMap, config: &CookieConfig) -> Option<Identity> {
    let session_id = read_signed(headers, SESSION_COOKIE, config)?.parse().ok()?;
    let role = Role::parse(&read_signed(headers, ROLE_COOKIE, config)?).ok()?;
    let student_id = read_signed(headers, STUDENT_COOKIE, config).and_then(|v| v.parse().ok());
    Some(Identity {
        session_id,
        role,
        student_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn test_config() -> CookieConfig {
        CookieConfig {
            secret: "test-cookie-secret".to_string(),
            max_age_hours: 6,
            secure: false,
        }
    }

    /// Turn `Set-Cookie` headers into a request `Cookie` header.
    fn as_request(set: &SetCookies) -> HeaderMap {
        let pairs: Vec<String> = set
            .0
            .iter()
            .filter_map(|(_, v)| v.split(';').next().map(str::to_string))
            .filter(|pair| !pair.ends_with('='))
            .collect();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
        headers
    }

    #[test]
    fn sign_and_verify() {
        let config = test_config();
        let token = sign_value(SESSION_COOKIE, "42", &config).unwrap();
        assert_eq!(verify_value(SESSION_COOKIE, &token, &config).as_deref(), Some("42"));
    }

    #[test]
    fn value_is_bound_to_cookie_name() {
        let config = test_config();
        let token = sign_value(STUDENT_COOKIE, "7", &config).unwrap();
        assert_eq!(verify_value(SESSION_COOKIE, &token, &config), None);
    }

    #[test]
    fn different_secret_fails() {
        let config = test_config();
        let token = sign_value(ROLE_COOKIE, "teacher", &config).unwrap();
        let other = CookieConfig {
            secret: "another-secret".into(),
            ..test_config()
        };
        assert_eq!(verify_value(ROLE_COOKIE, &token, &other), None);
    }

    #[test]
    fn expired_value_fails() {
        let config = test_config();
        let now = chrono::Utc::now().timestamp();
        let claims = CookieClaims {
            name: ROLE_COOKIE.into(),
            value: "teacher".into(),
            exp: now - 300,
            iat: now - 600,
            jti: "x".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert_eq!(verify_value(ROLE_COOKIE, &token, &config), None);
    }

    #[test]
    fn issue_then_read_round_trips_identity() {
        let config = test_config();
        let identity = Identity {
            session_id: 3,
            role: Role::Student,
            student_id: Some(11),
        };
        let set = issue(&identity, &config).unwrap();
        assert_eq!(set.0.len(), 3);
        assert_eq!(read_identity(&as_request(&set), &config), Some(identity));
    }

    #[test]
    fn teacher_identity_clears_student_cookie() {
        let config = test_config();
        let set = issue(
            &Identity {
                session_id: 1,
                role: Role::Teacher,
                student_id: None,
            },
            &config,
        )
        .unwrap();
        let student = set
            .0
            .iter()
            .find(|(_, v)| v.starts_with(STUDENT_COOKIE))
            .unwrap();
        assert!(student.1.contains("Max-Age=0"));
    }

    #[test]
    fn attributes() {
        let mut config = test_config();
        let (_, header) = set_cookie(SESSION_COOKIE, "tok", &config);
        assert_eq!(
            header,
            "easel_session=tok; HttpOnly; Path=/; SameSite=Lax; Max-Age=21600"
        );
        config.secure = true;
        let (_, header) = clear_cookie(ROLE_COOKIE, &config);
        assert!(header.ends_with("Max-Age=0; Secure"));
    }

    #[test]
    fn read_cookie_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("a=1; easel_role=xyz; b=2"));
        assert_eq!(read_cookie(&headers, ROLE_COOKIE), Some("xyz"));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn missing_role_means_no_identity() {
        let config = test_config();
        let token = sign_value(SESSION_COOKIE, "1", &config).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}")).unwrap(),
        );
        assert_eq!(read_identity(&headers, &config), None);
    }
}
