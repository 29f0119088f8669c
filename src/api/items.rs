//! Item endpoints: catalog metadata and the copies minted for each item

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        copy::{BookCopy, MintCopies},
        item::{CreateItem, Item, UpdateItem},
    },
};

/// List items with their copy counters
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    responses(
        (status = 200, description = "List of items", body = Vec<Item>)
    )
)]
pub async fn list_items(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.catalog.list_items().await?;
    Ok(Json(items))
}

/// Get item by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(id).await?;
    Ok(Json(item))
}

/// Create a new item
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_item(
    State(state): State<crate::AppState>,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    item.validate()?;
    let created = state.services.catalog.create_item(item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update item metadata
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Item updated", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(item): Json<UpdateItem>,
) -> AppResult<Json<Item>> {
    item.validate()?;
    let updated = state.services.catalog.update_item(id, item).await?;
    Ok(Json(updated))
}

/// Delete an item without copies
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item has copies")
    )
)]
pub async fn delete_item(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List copies of an item, ordered by serial
#[utoipa::path(
    get,
    path = "/items/{id}/copies",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "List of copies", body = Vec<BookCopy>),
        (status = 404, description = "Item not found")
    )
)]
pub async fn list_copies(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vec<BookCopy>>> {
    let copies = state.services.catalog.copies_for_item(id).await?;
    Ok(Json(copies))
}

/// Mint new copies of an item
#[utoipa::path(
    post,
    path = "/items/{id}/copies",
    tag = "copies",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    request_body = MintCopies,
    responses(
        (status = 201, description = "Copies created", body = Vec<BookCopy>),
        (status = 400, description = "Invalid copy count"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "No free copy code")
    )
)]
pub async fn mint_copies(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<MintCopies>,
) -> AppResult<(StatusCode, Json<Vec<BookCopy>>)> {
    request.validate()?;
    let copies = state.services.inventory.mint_copies(id, request.count).await?;
    Ok((StatusCode::CREATED, Json(copies)))
}
