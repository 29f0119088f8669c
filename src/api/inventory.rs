//! Inventory-wide endpoints: counter reconciliation and dashboard figures

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::inventory::{InventorySummary, ReconcileReport, ReconcileRequest},
};

/// Recount copies and repair drifted item counters
#[utoipa::path(
    post,
    path = "/inventory/reconcile",
    tag = "inventory",
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Reconciliation report", body = ReconcileReport),
        (status = 404, description = "Item not found")
    )
)]
pub async fn reconcile(
    State(state): State<crate::AppState>,
    request: Option<Json<ReconcileRequest>>,
) -> AppResult<Json<ReconcileReport>> {
    let Json(request) = request.unwrap_or_default();
    let report = state.services.inventory.reconcile(request.item_id).await?;
    Ok(Json(report))
}

/// Dashboard figures
#[utoipa::path(
    get,
    path = "/stats",
    tag = "inventory",
    responses(
        (status = 200, description = "Inventory summary", body = InventorySummary)
    )
)]
pub async fn get_stats(State(state): State<crate::AppState>) -> AppResult<Json<InventorySummary>> {
    let summary = state.services.loans.summary().await?;
    Ok(Json(summary))
}
