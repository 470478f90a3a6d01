//! Helpers for wiring the application against [`MemoryStore`] in tests

use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use chrono::Duration;

use crate::app_state::AppState;
use crate::config::{AuthConfig, Config, DatabaseConfig};
use crate::routes;
use crate::store::MemoryStore;

/// Auth settings with the cheapest bcrypt cost so tests stay fast
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_owned(),
        token_ttl: Duration::hours(5),
        bcrypt_cost: 4,
    }
}

pub fn test_config(upload_dir: &Path) -> Config {
    Config {
        host: IpAddr::from([127, 0, 0, 1]),
        port: 0,
        database: DatabaseConfig {
            url: "postgres://unused".to_owned(),
            max_connections: 1,
        },
        auth: test_auth_config(),
        upload_dir: upload_dir.to_path_buf(),
        cors_allowed_origins: Vec::new(),
    }
}

/// Full router over a fresh in-memory store. The store is returned too so
/// tests can inspect or adjust records directly.
pub fn test_app(upload_dir: &Path) -> (Router, Arc<MemoryStore>) {
    let config = test_config(upload_dir);
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), &config.auth, &config.upload_dir);
    (routes::app(state, &config), store)
}
