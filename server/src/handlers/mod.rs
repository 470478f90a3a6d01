//! API handlers for the ReWear backend

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod items;
pub mod swaps;
pub mod upload;

pub use admin::{approve_item, delete_item, list_pending_items, reject_item};
pub use auth::{login, signup};
pub use dashboard::get_dashboard;
pub use items::{create_item, get_item, list_items};
pub use swaps::{accept_swap, create_swap, redeem_item, reject_swap};
pub use upload::upload_images;

// Re-export the extractors for handler use
pub use crate::middleware::auth::{AuthenticatedUser, OptionalUser};

pub async fn root() -> &'static str {
    "ReWear API Server"
}

pub async fn health_check() -> &'static str {
    "OK"
}
