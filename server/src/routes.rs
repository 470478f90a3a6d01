//! Route definitions for the ReWear API

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::Config;
use crate::handlers::*;
use crate::services::upload::{MAX_IMAGES, MAX_IMAGE_BYTES, PUBLIC_PREFIX};

/// Room for multipart framing on top of the image bytes.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// Auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
}

// Listing routes
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/:id", get(get_item))
}

// Dashboard routes
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(get_dashboard))
}

// Exchange routes
pub fn swap_routes() -> Router<AppState> {
    Router::new()
        .route("/api/swaps", post(create_swap))
        .route("/api/swaps/redeem", post(redeem_item))
        .route("/api/swaps/:id/accept", put(accept_swap))
        .route("/api/swaps/:id/reject", put(reject_swap))
}

// Moderation routes
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/items", get(list_pending_items))
        .route("/api/admin/items/:id", axum::routing::delete(delete_item))
        .route("/api/admin/items/:id/approve", put(approve_item))
        .route("/api/admin/items/:id/reject", put(reject_item))
}

// Upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload_images))
        .layer(DefaultBodyLimit::max(MAX_IMAGES * MAX_IMAGE_BYTES + MULTIPART_OVERHEAD))
}

/// Assemble the full application router
pub fn app(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(auth_routes())
        .merge(item_routes())
        .merge(dashboard_routes())
        .merge(swap_routes())
        .merge(admin_routes())
        .merge(upload_routes())
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&config.upload_dir))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(configure_cors(config)),
        )
}

fn configure_cors(config: &Config) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(config.cors_allowed_origins.clone())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
