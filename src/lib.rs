//! Bookbank school textbook lending pool
//!
//! Tracks physical copies of textbooks, lends them to students and keeps
//! per-title copy counters consistent with loans under concurrent use.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
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
}
