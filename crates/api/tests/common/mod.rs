#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use easel_api::auth::cookies::CookieConfig;
use easel_api::config::ServerConfig;
use easel_api::router::build_app_router;
use easel_api::state::AppState;
use easel_genai::{ChatTurn, GenAiError, GeneratedImage, GenerationProvider};

pub const SESSION_PASSWORD: &str = "sunflower";
pub const FAKE_IMAGE: &str = "iVBORw0KGgo=";

// ---------------------------------------------------------------------------
// Fake generation provider
// ---------------------------------------------------------------------------

/// Deterministic stand-in for the remote provider.
#[derive(Default)]
pub struct FakeProvider {
    pub fail_images: AtomicBool,
    pub fail_chat: AtomicBool,
    /// Milliseconds `generate_image` sleeps before answering.
    pub image_delay_ms: AtomicU64,
    pub image_calls: AtomicUsize,
    pub last_base_image: Mutex<Option<GeneratedImage>>,
    pub last_history: Mutex<Vec<ChatTurn>>,
}

impl FakeProvider {
    pub fn fail_images(&self, fail: bool) {
        self.fail_images.store(fail, Ordering::SeqCst);
    }

    pub fn fail_chat(&self, fail: bool) {
        self.fail_chat.store(fail, Ordering::SeqCst);
    }

    pub fn delay_images(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.image_delay_ms.store(millis, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    async fn generate_image(
        &self,
        prompt: &str,
        base_image: Option<&GeneratedImage>,
    ) -> Result<GeneratedImage, GenAiError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_base_image.lock().unwrap() = base_image.cloned();
        let delay = self.image_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_images.load(Ordering::SeqCst) {
            return Err(GenAiError::Api {
                status: 503,
                message: format!("model overloaded for '{prompt}'"),
            });
        }
        Ok(GeneratedImage {
            data_base64: FAKE_IMAGE.to_string(),
            mime_type: "image/png".to_string(),
        })
    }

    async fn chat_complete(&self, history: &[ChatTurn]) -> Result<String, GenAiError> {
        *self.last_history.lock().unwrap() = history.to_vec();
        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(GenAiError::Empty("no text in chat response".into()));
        }
        let last = history.last().map(|t| t.content.as_str()).unwrap_or("");
        Ok(format!("You said: {last}"))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and no teacher key.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        cookies: CookieConfig {
            secret: "test-cookie-secret-long-enough".to_string(),
            max_age_hours: 6,
            secure: false,
        },
        teacher_key: None,
    }
}

/// Build the full application router over a fresh [`FakeProvider`].
pub fn build_test_app(pool: PgPool) -> (Router, Arc<FakeProvider>) {
    build_test_app_with(pool, test_config())
}

/// Build the full application router with a custom config.
///
/// Uses the same [`build_app_router`] as `main.rs` so tests exercise the
/// production middleware stack.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> (Router, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider::default());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        generator: provider.clone(),
    };
    (build_app_router(state, &config), provider)
}

// ---------------------------------------------------------------------------
// Cookie jar
// ---------------------------------------------------------------------------

/// Minimal client-side cookie store: remembers `Set-Cookie` values and drops
/// cleared ones.
#[derive(Debug, Default, Clone)]
pub struct Jar(BTreeMap<String, String>);

impl Jar {
    pub fn absorb<B>(&mut self, response: &Response<B>) {
        for header in response.headers().get_all(SET_COOKIE) {
            let Ok(text) = header.to_str() else { continue };
            let Some((name, rest)) = text.split_once('=') else { continue };
            let value = rest.split(';').next().unwrap_or("");
            if value.is_empty() || text.contains("Max-Age=0") {
                self.0.remove(name);
            } else {
                self.0.insert(name.to_string(), value.to_string());
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn header(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    jar: &mut Jar,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    let cookie = jar.header();
    if !cookie.is_empty() {
        builder = builder.header(COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    jar.absorb(&response);
    response
}

pub async fn get(app: &Router, uri: &str, jar: &mut Jar) -> Response<Body> {
    send(app, Method::GET, uri, None, jar).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value, jar: &mut Jar) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), jar).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value, jar: &mut Jar) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body), jar).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a status and return the parsed body.
pub async fn expect(response: Response<Body>, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status; body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Start a session; the returned jar carries teacher cookies.
pub async fn start_as_teacher(app: &Router) -> Jar {
    let mut jar = Jar::default();
    let response = post_json(
        app,
        "/api/v1/session/start",
        json!({ "password": SESSION_PASSWORD }),
        &mut jar,
    )
    .await;
    expect(response, StatusCode::CREATED).await;
    jar
}

/// Generate `count` credentials as the teacher; returns `(username, password)`.
pub async fn generate_students(app: &Router, teacher: &mut Jar, count: usize) -> Vec<(String, String)> {
    let response = post_json(
        app,
        "/api/v1/teacher/credentials",
        json!({ "count": count }),
        teacher,
    )
    .await;
    let json = expect(response, StatusCode::CREATED).await;
    json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["username"].as_str().unwrap().to_string(),
                c["password"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

/// Log a student in; the returned jar carries student cookies.
pub async fn login_student(app: &Router, username: &str, password: &str) -> Jar {
    let mut jar = Jar::default();
    let response = post_json(
        app,
        "/api/v1/students/login",
        json!({ "username": username, "password": password }),
        &mut jar,
    )
    .await;
    expect(response, StatusCode::OK).await;
    jar
}

/// Start a session, create one student and log them in.
pub async fn classroom_with_student(app: &Router) -> (Jar, Jar) {
    let mut teacher = start_as_teacher(app).await;
    let creds = generate_students(app, &mut teacher, 1).await;
    let student = login_student(app, &creds[0].0, &creds[0].1).await;
    (teacher, student)
}

/// POST a submission, optionally refining `parent`.
pub async fn submit(app: &Router, jar: &mut Jar, prompt: &str, parent: Option<i64>) -> Response<Body> {
    post_json(
        app,
        "/api/v1/submissions",
        json!({ "prompt": prompt, "parent_submission_id": parent }),
        jar,
    )
    .await
}
