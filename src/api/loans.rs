//! Loan endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{LoanDetails, LoanPatch, OpenLoan},
};

/// List all loans, newest first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "List of loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(State(state): State<crate::AppState>) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_loans().await?;
    Ok(Json(loans))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(loan))
}

/// Hand a copy out to a borrower
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = OpenLoan,
    responses(
        (status = 201, description = "Loan opened", body = LoanDetails),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Borrower or copy not found"),
        (status = 409, description = "Copy not available"),
        (status = 503, description = "Copy is locked by another operation, retry")
    )
)]
pub async fn open_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<OpenLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state.services.inventory.open_loan(request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Update a loan: return, substitution, condition and payment fields
#[utoipa::path(
    put,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = LoanPatch,
    responses(
        (status = 200, description = "Loan updated", body = LoanDetails),
        (status = 400, description = "Invalid or empty update"),
        (status = 404, description = "Loan or substitute copy not found"),
        (status = 409, description = "Transition not allowed or substitute unavailable"),
        (status = 503, description = "Loan is locked by another operation, retry")
    )
)]
pub async fn update_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(patch): Json<LoanPatch>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.inventory.update_loan(id, patch).await?;
    Ok(Json(loan))
}
