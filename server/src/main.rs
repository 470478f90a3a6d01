//! ReWear Backend Server
//!
//! REST API for the ReWear clothing exchange: accounts, listings, swap
//! proposals, points redemption, image upload and admin moderation.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rewear_server::app_state::AppState;
use rewear_server::config::Config;
use rewear_server::routes;
use rewear_server::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rewear_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    tracing::info!("Connecting to database...");
    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    store.migrate().await.context("failed to run migrations")?;
    tracing::info!("Database connected successfully");

    let app_state = AppState::new(Arc::new(store), &config.auth, &config.upload_dir);
    app_state
        .upload_service
        .ensure_dir()
        .await
        .context("failed to prepare upload directory")?;

    let app = routes::app(app_state, &config);

    let addr = config.socket_addr();
    tracing::info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
