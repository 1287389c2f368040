//! Integration tests for signup, login, and identity endpoints.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::*;

#[tokio::test]
async fn signup_then_login_flow() {
    let app = create_test_app().await;

    let response = signup(&app.server, "ada@example.com", "Str0ng!pass").await;
    response.assert_status(StatusCode::CREATED);

    // Unapproved accounts cannot log in, and the error is the same as a bad
    // password
    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "ada@example.com", "password": "Str0ng!pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    approve_user(&app.db, "ada@example.com").await;

    let token = login(&app.server, "ada@example.com", "Str0ng!pass").await;
    assert!(!token.is_empty());

    let user_id = user_id_by_email(&app.db, "ada@example.com").await;
    let response = app
        .server
        .get("/userinfo")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["userId"].as_str().unwrap(), user_id);
    assert!(!body["isAdmin"].as_bool().unwrap());
}

#[tokio::test]
async fn signup_rejects_invalid_fields() {
    let app = create_test_app().await;

    // Bad email
    let response = app
        .server
        .post("/signup")
        .json(&json!({
            "first_name": "Test",
            "last_name": "User",
            "email": "not-an-email",
            "date_of_birth": "1990-01-01",
            "password": "Str0ng!pass"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Weak password: no uppercase or special character
    let response = app
        .server
        .post("/signup")
        .json(&json!({
            "first_name": "Test",
            "last_name": "User",
            "email": "bob@example.com",
            "date_of_birth": "1990-01-01",
            "password": "weakpassword"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Missing first name
    let response = app
        .server
        .post("/signup")
        .json(&json!({
            "first_name": "",
            "last_name": "User",
            "email": "bob@example.com",
            "date_of_birth": "1990-01-01",
            "password": "Str0ng!pass"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Nothing was persisted
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(app.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let app = create_test_app().await;

    signup(&app.server, "ada@example.com", "Str0ng!pass")
        .await
        .assert_status(StatusCode::CREATED);

    let response = signup(&app.server, "ada@example.com", "0ther!pass").await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let app = create_test_app().await;

    signup(&app.server, "ada@example.com", "Str0ng!pass")
        .await
        .assert_status(StatusCode::CREATED);
    approve_user(&app.db, "ada@example.com").await;

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "ada@example.com", "password": "Wr0ng!pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "nobody@example.com", "password": "Str0ng!pass" }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_token_cookie() {
    let app = create_test_app().await;

    let (_, _) = register_user(&app, "ada@example.com", "Str0ng!pass").await;

    let response = app
        .server
        .post("/login")
        .json(&json!({ "email": "ada@example.com", "password": "Str0ng!pass" }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let cookie = response.cookie("token");
    assert_eq!(cookie.value(), body["token"].as_str().unwrap());
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = create_test_app().await;

    app.server
        .get("/userinfo")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/dashboard/summary")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Garbage token is rejected the same way
    let response = app
        .server
        .get("/userinfo")
        .add_header(AUTHORIZATION, "Bearer not-a-real-token".to_string())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}
