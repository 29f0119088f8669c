//! Borrower model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Person copies are lent to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrower {
    pub id: i32,
    /// School-issued student number, unique
    pub student_number: String,
    pub name: String,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create borrower request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrower {
    #[validate(length(min = 1, max = 32, message = "Student number must be 1 to 32 characters"))]
    pub student_number: String,
    #[validate(length(min = 1, max = 255, message = "Name must be 1 to 255 characters"))]
    pub name: String,
    pub course: Option<String>,
}
