//! Inventory-wide figures: counter reconciliation and dashboard summary

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Cached counters of one item next to a full recount of its copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CounterDrift {
    pub item_id: i32,
    pub stored_total: i32,
    pub stored_available: i32,
    pub counted_total: i32,
    pub counted_available: i32,
}

impl CounterDrift {
    pub fn has_drift(&self) -> bool {
        self.stored_total != self.counted_total || self.stored_available != self.counted_available
    }
}

/// Reconcile request; all items when `item_id` is omitted
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReconcileRequest {
    pub item_id: Option<i32>,
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReconcileReport {
    /// Number of items whose counters were recounted
    pub checked: usize,
    /// Items whose cached counters had drifted (now repaired)
    pub repaired: Vec<CounterDrift>,
}

/// Dashboard figures
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InventorySummary {
    pub items: i64,
    pub copies_total: i64,
    pub copies_available: i64,
    pub loans_active: i64,
    pub loans_overdue: i64,
    pub loans_returned: i64,
    /// Sum of amounts due on loans not yet paid
    pub outstanding_amount: Decimal,
}
