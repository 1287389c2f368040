//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use safeshare::captcha::CaptchaVerifier;
use safeshare::config::Config;
use safeshare::db::Database;
use safeshare::error::Result;
use safeshare::scanner::{MalwareScanner, ScanVerdict};
use safeshare::storage::BlobStore;
use safeshare::{create_router, AppState};

/// Stub scanner implementing the production trait. Blobs whose stored name
/// contains "virus" are flagged infected, everything else is clean.
pub struct StubScanner;

#[async_trait]
impl MalwareScanner for StubScanner {
    async fn scan(&self, blob_path: &Path) -> Result<ScanVerdict> {
        let name = blob_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        if name.contains("virus") {
            Ok(ScanVerdict::Infected)
        } else {
            Ok(ScanVerdict::Clean)
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
    pub upload_dir: PathBuf,
    _tmp: TempDir,
}

/// Create a test server backed by a temp-dir database and blob store, with
/// the stub scanner injected and the bot check disabled.
pub async fn create_test_app() -> TestApp {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let upload_dir = tmp.path().join("uploads");

    let mut config = Config::default();
    config.jwt.secret = "test-secret-key-for-testing-only".to_string();
    config.database.path = db_path.to_string_lossy().into_owned();
    config.storage.upload_dir = upload_dir.to_string_lossy().into_owned();
    config.rate_limit.auth_per_minute = 1000;

    let db = Database::new(&config.database.path)
        .await
        .expect("Failed to create test database");
    db.run_migrations().await.expect("Failed to run migrations");

    let blobs = Arc::new(BlobStore::new(&upload_dir));
    blobs.init().await.expect("Failed to init blob store");

    let captcha = Arc::new(CaptchaVerifier::new(&config.captcha).unwrap());

    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        blobs,
        scanner: Arc::new(StubScanner),
        captcha,
    };

    let server = TestServer::new(create_router(state)).expect("Failed to create test server");

    TestApp {
        server,
        db,
        upload_dir,
        _tmp: tmp,
    }
}

/// Register a user through the API.
pub async fn signup(server: &TestServer, email: &str, password: &str) -> TestResponse {
    server
        .post("/signup")
        .json(&json!({
            "first_name": "Test",
            "last_name": "User",
            "email": email,
            "date_of_birth": "1990-01-01",
            "password": password
        }))
        .await
}

/// Simulate the external approval process.
pub async fn approve_user(db: &Database, email: &str) {
    sqlx::query("UPDATE users SET approved = 1 WHERE email = ?")
        .bind(email)
        .execute(db.pool())
        .await
        .expect("Failed to approve user");
}

/// Promote a user to admin.
pub async fn make_admin(db: &Database, email: &str) {
    sqlx::query("UPDATE users SET role = 'admin' WHERE email = ?")
        .bind(email)
        .execute(db.pool())
        .await
        .expect("Failed to promote user");
}

pub async fn user_id_by_email(db: &Database, email: &str) -> String {
    sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(db.pool())
        .await
        .expect("User not found")
}

/// Log in and return the bearer token.
pub async fn login(server: &TestServer, email: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    body["token"].as_str().expect("No token in response").to_string()
}

/// Register, approve, and log in a user in one step.
pub async fn register_user(app: &TestApp, email: &str, password: &str) -> (String, String) {
    let response = signup(&app.server, email, password).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    approve_user(&app.db, email).await;
    let token = login(&app.server, email, password).await;
    let user_id = user_id_by_email(&app.db, email).await;
    (user_id, token)
}

/// Register, approve, promote to admin, and log in.
pub async fn register_admin(app: &TestApp, email: &str, password: &str) -> (String, String) {
    let response = signup(&app.server, email, password).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    approve_user(&app.db, email).await;
    make_admin(&app.db, email).await;
    let token = login(&app.server, email, password).await;
    let user_id = user_id_by_email(&app.db, email).await;
    (user_id, token)
}

/// Upload a file through the multipart endpoint.
pub async fn upload(
    server: &TestServer,
    token: &str,
    file_name: &str,
    mime_type: &str,
    data: Vec<u8>,
) -> TestResponse {
    let part = Part::bytes(data)
        .file_name(file_name.to_string())
        .mime_type(mime_type);
    let form = MultipartForm::new().add_part("file", part);

    server
        .post("/upload")
        .add_header(AUTHORIZATION, format!("Bearer {}", token))
        .multipart(form)
        .await
}

/// Number of blobs currently on disk.
pub fn blob_count(upload_dir: &Path) -> usize {
    match std::fs::read_dir(upload_dir) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

/// Number of metadata rows.
pub async fn file_row_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(db.pool())
        .await
        .expect("Failed to count files")
}
