//! Reference data endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{ChecklistPart, Subject},
};

/// List subjects
#[utoipa::path(
    get,
    path = "/subjects",
    tag = "catalog",
    responses(
        (status = 200, description = "List of subjects", body = Vec<Subject>)
    )
)]
pub async fn list_subjects(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Subject>>> {
    let subjects = state.services.catalog.subjects().await?;
    Ok(Json(subjects))
}

/// Condition checklist used for hand-out and return inspections
#[utoipa::path(
    get,
    path = "/checklist",
    tag = "catalog",
    responses(
        (status = 200, description = "Checklist parts and their options", body = Vec<ChecklistPart>)
    )
)]
pub async fn get_checklist(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<ChecklistPart>>> {
    let parts = state.services.catalog.checklist().await?;
    Ok(Json(parts))
}
