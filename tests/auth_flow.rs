use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use medipass::app::build_app;
use medipass::config::{AppConfig, JwtConfig};
use medipass::state::AppState;

async fn test_app() -> (Router, SqlitePool) {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("migrations");

    let config = Arc::new(AppConfig {
        database_url: "sqlite::memory:".into(),
        jwt: JwtConfig {
            secret: "test-secret".into(),
            algorithm: Algorithm::HS256,
            ttl_minutes: 30,
        },
    });

    let app = build_app(AppState::from_parts(db.clone(), config));
    (app, db)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    bearer: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

#[tokio::test]
async fn register_login_me_flow() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/register",
        Some(json!({"username": "alice", "password": "password1", "full_name": "Alice A"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User registered successfully");

    let (status, body) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"username": "alice", "password": "password1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["expires_in"], 1800);
    let token = body["access_token"].as_str().expect("token").to_string();

    let (status, body) = send(&app, "GET", "/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["full_name"], "Alice A");
    assert_eq!(body["is_active"], true);
    assert!(body["id"].is_i64());
    assert!(body["created_at"].is_string());
    assert!(body["last_login"].is_string());
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(&app, "GET", "/protected", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "Hello alice, this is a protected route!"
    );
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthenticated() {
    let (app, _db) = test_app().await;

    send(
        &app,
        "POST",
        "/register",
        Some(json!({"username": "alice", "password": "password1"})),
        None,
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"username": "alice", "password": "wrong-password"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown user gets the identical response body.
    let (status2, body2) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"username": "nobody", "password": "password1"})),
        None,
    )
    .await;
    assert_eq!(status2, StatusCode::UNAUTHORIZED);
    assert_eq!(body, body2);
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let (app, db) = test_app().await;

    let payload = json!({"username": "alice", "password": "password1"});
    let (status, _) = send(&app, "POST", "/register", Some(payload.clone()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/register", Some(payload), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&db)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn short_password_is_rejected_before_storage() {
    let (app, db) = test_app().await;

    let (status, _) = send(
        &app,
        "POST",
        "/register",
        Some(json!({"username": "alice", "password": "short"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&db)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn deactivated_user_fails_with_unexpired_token() {
    let (app, db) = test_app().await;

    send(
        &app,
        "POST",
        "/register",
        Some(json!({"username": "alice", "password": "password1"})),
        None,
    )
    .await;
    let (_, body) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"username": "alice", "password": "password1"})),
        None,
    )
    .await;
    let token = body["access_token"].as_str().expect("token").to_string();

    sqlx::query("UPDATE users SET is_active = 0 WHERE username = ?")
        .bind("alice")
        .execute(&db)
        .await
        .expect("deactivate");

    // Token is still unexpired but the fresh store check rejects it.
    let (status, _) = send(&app, "GET", "/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Login is rejected as well once the account is inactive.
    let (status, _) = send(
        &app,
        "POST",
        "/login",
        Some(json!({"username": "alice", "password": "password1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_or_missing_bearer_is_rejected() {
    let (app, _db) = test_app().await;

    let (status, _) = send(&app, "GET", "/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/me", None, Some("garbage-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Wrong scheme entirely.
    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header(header::AUTHORIZATION, "Basic abc123")
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_healthy() {
    let (app, _db) = test_app().await;

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
}
