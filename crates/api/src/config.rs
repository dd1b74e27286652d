use crate::auth::cookies::CookieConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the cookie secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `120`). Must stay above the
    /// generation provider timeout so remote failures surface as 502, not 408.
    pub request_timeout_secs: u64,
    /// Identity cookie signing and attributes.
    pub cookies: CookieConfig,
    /// Shared secret required to start a session or join as teacher.
    /// `None` disables the check.
    pub teacher_key: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `120`                      |
    /// | `TEACHER_KEY`          | unset                      |
    ///
    /// Cookie variables are documented on [`CookieConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let teacher_key = std::env::var("TEACHER_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let cookies = CookieConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            cookies,
            teacher_key,
        }
    }
}
