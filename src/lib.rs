//! Book lending REST API
//!
//! Accounts, a book catalog with per-book owners, and an atomic page
//! transfer between books. Every request runs through an ordered pipeline of
//! stages (logging, panic recovery, rate limiting, CORS, authentication and
//! authorization) described in [`middleware`].

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub repository: repository::Repository,
}
