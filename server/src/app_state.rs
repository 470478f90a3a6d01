//! Application state shared across handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::AuthConfig;
use crate::services::{
    AuthService, DashboardService, ExchangeService, ListingService, ModerationService,
    UploadService,
};
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub listing_service: Arc<ListingService>,
    pub exchange_service: Arc<ExchangeService>,
    pub moderation_service: Arc<ModerationService>,
    pub dashboard_service: Arc<DashboardService>,
    pub upload_service: Arc<UploadService>,
}

impl AppState {
    /// Wire every service to the same store
    pub fn new(store: Arc<dyn Store>, auth: &AuthConfig, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            auth_service: Arc::new(AuthService::new(store.clone(), auth)),
            listing_service: Arc::new(ListingService::new(store.clone())),
            exchange_service: Arc::new(ExchangeService::new(store.clone())),
            moderation_service: Arc::new(ModerationService::new(store.clone())),
            dashboard_service: Arc::new(DashboardService::new(store)),
            upload_service: Arc::new(UploadService::new(upload_dir)),
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<ListingService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.listing_service.clone()
    }
}

impl FromRef<AppState> for Arc<ExchangeService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.exchange_service.clone()
    }
}

impl FromRef<AppState> for Arc<ModerationService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.moderation_service.clone()
    }
}

impl FromRef<AppState> for Arc<DashboardService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.dashboard_service.clone()
    }
}

impl FromRef<AppState> for Arc<UploadService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.upload_service.clone()
    }
}
