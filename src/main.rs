use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safeshare::captcha::CaptchaVerifier;
use safeshare::config::Config;
use safeshare::db::Database;
use safeshare::scanner::HttpScanner;
use safeshare::storage::BlobStore;
use safeshare::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safeshare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting safeshare...");

    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    let blobs = Arc::new(BlobStore::new(&config.storage.upload_dir));
    blobs.init().await?;

    let scanner = Arc::new(HttpScanner::new(&config.scanner)?);
    let captcha = Arc::new(CaptchaVerifier::new(&config.captcha)?);

    let state = AppState {
        db,
        config: config.clone(),
        blobs,
        scanner,
        captcha,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
