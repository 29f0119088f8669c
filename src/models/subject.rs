//! Subject reference data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Course subject an item may belong to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: i32,
    pub name: String,
    pub course: Option<String>,
    pub elective: bool,
    pub created_at: DateTime<Utc>,
}
