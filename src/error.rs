//! Error types for Bookbank server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchData = 5,
    CopyNotAvailable = 7,
    BadValue = 18,
    DbBusy = 22,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

/// SQLSTATE codes for failures that leave nothing applied and may be retried as a whole:
/// serialization_failure, deadlock_detected, lock_not_available.
const RETRYABLE_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

/// SQLSTATE unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl AppError {
    /// True for transient storage failures (lock timeout, deadlock, pool exhaustion)
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::PoolTimedOut) => true,
            AppError::Database(sqlx::Error::Database(db)) => db
                .code()
                .map(|code| RETRYABLE_SQLSTATES.iter().any(|state| code == *state))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Turns a unique constraint violation into a `Conflict` carrying `message`,
    /// leaving every other error untouched.
    pub fn unique_violation_as_conflict(err: sqlx::Error, message: &str) -> AppError {
        if let sqlx::Error::Database(ref db) = err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return AppError::Conflict(message.to_string());
            }
        }
        AppError::Database(err)
    }

    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::CopyNotAvailable, msg.clone())
            }
            AppError::Database(_) if self.is_retryable() => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::DbBusy,
                "Storage busy, retry the operation".to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DbFailure,
                "Database error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::Failure,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) if self.is_retryable() => {
                tracing::warn!("Retryable storage failure: {:?}", e);
            }
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
            _ => {}
        }

        let (status, code, message) = self.parts();
        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
