pub mod authz;
pub mod captcha;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod scanner;
pub mod services;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::captcha::CaptchaVerifier;
use crate::config::Config;
use crate::db::Database;
use crate::middleware::rate_limit::{auth_rate_limit, RateLimitState};
use crate::scanner::MalwareScanner;
use crate::storage::BlobStore;

/// Body cap for the upload route. Slightly above the validation limit so an
/// oversized payload is rejected by the content validator with a clean 400
/// instead of a protocol-level 413.
const UPLOAD_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Application state shared across handlers. All external collaborators are
/// constructed at startup and injected here; nothing is ambient.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub blobs: Arc<BlobStore>,
    pub scanner: Arc<dyn MalwareScanner>,
    pub captcha: Arc<CaptchaVerifier>,
}

pub fn create_router(state: AppState) -> Router {
    // The browser UI lives on another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let rate_limit = Arc::new(RateLimitState::new(state.config.rate_limit.auth_per_minute));
    rate_limit.clone().start_cleanup_task();

    // Credential endpoints: no token required, rate limited per IP
    let public_routes = Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .layer(axum::middleware::from_fn(move |req, next| {
            let limiter = rate_limit.clone();
            auth_rate_limit(limiter, req, next)
        }));

    // Everything else requires a valid bearer token
    let protected_routes = Router::new()
        .route("/upload", post(handlers::file::upload))
        .route("/dashboard/summary", get(handlers::file::dashboard_summary))
        .route("/userinfo", get(handlers::auth::userinfo))
        .route(
            "/files/:id",
            get(handlers::file::list_files).delete(handlers::file::delete_file),
        )
        .route("/files/toggleShare/:fileId", put(handlers::file::toggle_share))
        .route("/download/:fileId", get(handlers::file::download))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
