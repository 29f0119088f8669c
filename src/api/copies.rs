//! Copy endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::copy::{BookCopy, UpdateCopy},
};

/// Get copy by ID
#[utoipa::path(
    get,
    path = "/copies/{id}",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookCopy),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookCopy>> {
    let copy = state.services.catalog.get_copy(id).await?;
    Ok(Json(copy))
}

/// Update a copy's condition or retire / restore it
#[utoipa::path(
    put,
    path = "/copies/{id}",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Copy ID")
    ),
    request_body = UpdateCopy,
    responses(
        (status = 200, description = "Copy updated", body = BookCopy),
        (status = 400, description = "Invalid condition or empty update"),
        (status = 404, description = "Copy not found"),
        (status = 409, description = "Copy is on an active loan")
    )
)]
pub async fn update_copy(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(update): Json<UpdateCopy>,
) -> AppResult<Json<BookCopy>> {
    let copy = state.services.inventory.update_copy(id, update).await?;
    Ok(Json(copy))
}
