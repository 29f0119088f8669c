//! Item (book title) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book title managed by the pool.
///
/// `total_copies` and `available_copies` are running counters kept in step with
/// the copies table by the inventory coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    /// School year the title is used in; first segment of copy codes
    pub course: Option<String>,
    pub subject_id: Option<i32>,
    /// Reference price, used to suggest the amount due for a lost copy
    pub price: Decimal,
    pub total_copies: i32,
    pub available_copies: i32,
    pub created_at: DateTime<Utc>,
    // Computed fields (populated when queried with JOINs, None otherwise)
    #[sqlx(default)]
    #[serde(default)]
    pub subject_name: Option<String>,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub course: Option<String>,
    pub subject_id: Option<i32>,
    pub price: Option<Decimal>,
}

/// Update item request. Copy counters are not editable here.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateItem {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub course: Option<String>,
    pub subject_id: Option<i32>,
    pub price: Option<Decimal>,
}

/// Title and course read under the item lock when minting copies
#[derive(Debug, Clone, FromRow)]
pub struct MintSource {
    pub title: String,
    pub course: Option<String>,
}

/// Ensure a price is not negative
pub fn check_price(price: Option<Decimal>) -> crate::error::AppResult<()> {
    match price {
        Some(p) if p.is_sign_negative() && !p.is_zero() => Err(crate::error::AppError::Validation(
            "Price cannot be negative".to_string(),
        )),
        _ => Ok(()),
    }
}
