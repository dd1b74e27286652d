//! HTTP-level integration tests for session lifecycle, student login and
//! the authorization gate.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, expect, generate_students, get, login_student, post_json, start_as_teacher, Jar,
    SESSION_PASSWORD,
};
use easel_api::auth::cookies::{ROLE_COOKIE, SESSION_COOKIE, STUDENT_COOKIE};
use easel_db::repositories::SessionRepo;
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Start / end
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn start_sets_teacher_cookies(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let mut jar = Jar::default();

    let response = post_json(
        &app,
        "/api/v1/session/start",
        json!({ "password": SESSION_PASSWORD }),
        &mut jar,
    )
    .await;
    let set_cookies: Vec<String> = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let json = expect(response, StatusCode::CREATED).await;

    assert_eq!(json["data"]["role"], "teacher");
    assert!(jar.has(SESSION_COOKIE) && jar.has(ROLE_COOKIE));
    assert!(!jar.has(STUDENT_COOKIE));
    assert!(set_cookies
        .iter()
        .all(|c| c.contains("HttpOnly") && c.contains("SameSite=Lax")));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn short_password_is_rejected(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/session/start",
        json!({ "password": "abc" }),
        &mut Jar::default(),
    )
    .await;
    let json = expect(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn starting_again_ends_previous_session(pool: PgPool) {
    let (app, _) = common::build_test_app(pool.clone());
    let mut first = start_as_teacher(&app).await;
    let _second = start_as_teacher(&app).await;

    assert_eq!(SessionRepo::count_active(&pool).await.unwrap(), 1);

    // The first teacher's cookies point at an ended session.
    let response = get(&app, "/api/v1/teacher/students", &mut first).await;
    let json = expect(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn end_requires_teacher_and_clears_cookies(pool: PgPool) {
    let (app, _) = common::build_test_app(pool.clone());
    let mut teacher = start_as_teacher(&app).await;
    let creds = generate_students(&app, &mut teacher, 1).await;
    let mut student = login_student(&app, &creds[0].0, &creds[0].1).await;

    let response = post_json(&app, "/api/v1/session/end", json!({}), &mut student).await;
    expect(response, StatusCode::FORBIDDEN).await;

    let response = post_json(&app, "/api/v1/session/end", json!({}), &mut teacher).await;
    let json = expect(response, StatusCode::OK).await;
    assert_eq!(json["data"]["ended"], true);
    assert!(!teacher.has(SESSION_COOKIE));
    assert_eq!(SessionRepo::count_active(&pool).await.unwrap(), 0);

    // The student is locked out once the session is over.
    let response = get(&app, "/api/v1/submissions", &mut student).await;
    expect(response, StatusCode::UNAUTHORIZED).await;
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn join_without_active_session_is_not_found(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/session/join",
        json!({ "password": SESSION_PASSWORD, "role": "student" }),
        &mut Jar::default(),
    )
    .await;
    let json = expect(response, StatusCode::NOT_FOUND).await;
    assert_eq!(json["error"], "No active session");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn join_with_wrong_password_fails_for_any_role(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    start_as_teacher(&app).await;

    for role in ["teacher", "student"] {
        let response = post_json(
            &app,
            "/api/v1/session/join",
            json!({ "password": "wrong-password", "role": role }),
            &mut Jar::default(),
        )
        .await;
        expect(response, StatusCode::UNAUTHORIZED).await;
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn join_with_unknown_role_is_validation_error(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    start_as_teacher(&app).await;

    let response = post_json(
        &app,
        "/api/v1/session/join",
        json!({ "password": SESSION_PASSWORD, "role": "principal" }),
        &mut Jar::default(),
    )
    .await;
    expect(response, StatusCode::BAD_REQUEST).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn join_as_teacher_grants_dashboard(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    start_as_teacher(&app).await;

    let mut second_teacher = Jar::default();
    let response = post_json(
        &app,
        "/api/v1/session/join",
        json!({ "password": SESSION_PASSWORD, "role": "teacher" }),
        &mut second_teacher,
    )
    .await;
    expect(response, StatusCode::OK).await;

    let response = get(&app, "/api/v1/teacher/students", &mut second_teacher).await;
    expect(response, StatusCode::OK).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn teacher_key_guards_start_and_teacher_join(pool: PgPool) {
    let mut config = common::test_config();
    config.teacher_key = Some("chalkboard".into());
    let (app, _) = common::build_test_app_with(pool, config);

    let response = post_json(
        &app,
        "/api/v1/session/start",
        json!({ "password": SESSION_PASSWORD }),
        &mut Jar::default(),
    )
    .await;
    expect(response, StatusCode::UNAUTHORIZED).await;

    let response = post_json(
        &app,
        "/api/v1/session/start",
        json!({ "password": SESSION_PASSWORD, "teacher_key": "chalkboard" }),
        &mut Jar::default(),
    )
    .await;
    expect(response, StatusCode::CREATED).await;

    let response = post_json(
        &app,
        "/api/v1/session/join",
        json!({ "password": SESSION_PASSWORD, "role": "teacher", "teacher_key": "guess" }),
        &mut Jar::default(),
    )
    .await;
    expect(response, StatusCode::UNAUTHORIZED).await;

    // Students never need the key.
    let response = post_json(
        &app,
        "/api/v1/session/join",
        json!({ "password": SESSION_PASSWORD, "role": "student" }),
        &mut Jar::default(),
    )
    .await;
    expect(response, StatusCode::OK).await;
}

// ---------------------------------------------------------------------------
// Student login / current session
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn student_login_and_current_session(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let mut teacher = start_as_teacher(&app).await;
    let creds = generate_students(&app, &mut teacher, 2).await;
    let (username, password) = &creds[0];

    let mut student = login_student(&app, username, password).await;
    assert!(student.has(STUDENT_COOKIE));

    let json = expect(get(&app, "/api/v1/session", &mut student).await, StatusCode::OK).await;
    assert_eq!(json["data"]["active"], true);
    assert_eq!(json["data"]["role"], "student");
    assert_eq!(json["data"]["username"], username.as_str());

    let json = expect(
        get(&app, "/api/v1/session", &mut Jar::default()).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["active"], true);
    assert!(json["data"]["role"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn student_login_failures_share_one_message(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let mut teacher = start_as_teacher(&app).await;
    let creds = generate_students(&app, &mut teacher, 1).await;

    let wrong_password = post_json(
        &app,
        "/api/v1/students/login",
        json!({ "username": creds[0].0, "password": "nope" }),
        &mut Jar::default(),
    )
    .await;
    let unknown_user = post_json(
        &app,
        "/api/v1/students/login",
        json!({ "username": "ghost99", "password": "nope" }),
        &mut Jar::default(),
    )
    .await;

    let a = expect(wrong_password, StatusCode::UNAUTHORIZED).await;
    let b = expect(unknown_user, StatusCode::UNAUTHORIZED).await;
    assert_eq!(a["error"], b["error"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn students_from_an_ended_session_cannot_log_in(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let mut teacher = start_as_teacher(&app).await;
    let creds = generate_students(&app, &mut teacher, 1).await;
    start_as_teacher(&app).await;

    let response = post_json(
        &app,
        "/api/v1/students/login",
        json!({ "username": creds[0].0, "password": creds[0].1 }),
        &mut Jar::default(),
    )
    .await;
    expect(response, StatusCode::UNAUTHORIZED).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_clears_identity(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    let mut teacher = start_as_teacher(&app).await;
    let creds = generate_students(&app, &mut teacher, 1).await;
    let mut student = login_student(&app, &creds[0].0, &creds[0].1).await;

    let response = post_json(&app, "/api/v1/students/logout", json!({}), &mut student).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(!student.has(SESSION_COOKIE));
    assert!(!student.has(STUDENT_COOKIE));

    let response = get(&app, "/api/v1/submissions", &mut student).await;
    expect(response, StatusCode::UNAUTHORIZED).await;
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn anonymous_and_tampered_callers_are_unauthorized(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    start_as_teacher(&app).await;

    let response = get(&app, "/api/v1/submissions", &mut Jar::default()).await;
    expect(response, StatusCode::UNAUTHORIZED).await;

    let request = axum::http::Request::builder()
        .uri("/api/v1/submissions")
        .header(
            "cookie",
            format!("{SESSION_COOKIE}=1; {ROLE_COOKIE}=teacher"),
        )
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn joined_student_without_login_cannot_use_student_routes(pool: PgPool) {
    let (app, _) = common::build_test_app(pool);
    start_as_teacher(&app).await;

    let mut joined = Jar::default();
    let response = post_json(
        &app,
        "/api/v1/session/join",
        json!({ "password": SESSION_PASSWORD, "role": "student" }),
        &mut joined,
    )
    .await;
    expect(response, StatusCode::OK).await;

    let response = get(&app, "/api/v1/chat/threads", &mut joined).await;
    expect(response, StatusCode::FORBIDDEN).await;

    let response = get(&app, "/api/v1/teacher/activity", &mut joined).await;
    expect(response, StatusCode::FORBIDDEN).await;

    // Listing is allowed and shows only shared work (none yet).
    let json = expect(get(&app, "/api/v1/submissions", &mut joined).await, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}
