//! Libris library management server
//!
//! REST JSON API for a small library: catalog, student accounts, borrowing,
//! fines, payments and notifications, behind token authentication and
//! role/permission/ownership authorization.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod permissions;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use api::middleware::AuthState;
use permissions::PermissionTableError;
use repository::Repository;
use services::Services;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<Services>,
    pub auth: AuthState,
}

impl AppState {
    pub fn new(config: AppConfig, repository: Repository) -> Result<Self, PermissionTableError> {
        let auth = AuthState::from_config(&config)?;
        let services = Services::new(repository, &config);
        Ok(Self {
            config: Arc::new(config),
            services: Arc::new(services),
            auth,
        })
    }
}
