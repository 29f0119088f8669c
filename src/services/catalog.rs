//! Catalog service: items, their copies and reference data

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::BookCopy,
        item::{check_price, CreateItem, Item, UpdateItem},
        ChecklistPart, Subject,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_items(&self) -> AppResult<Vec<Item>> {
        self.repository.items.list().await
    }

    pub async fn get_item(&self, id: i32) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    pub async fn create_item(&self, item: CreateItem) -> AppResult<Item> {
        check_price(item.price)?;
        let created = self.repository.items.create(&item).await?;
        tracing::info!("Item {} created: {}", created.id, created.title);
        Ok(created)
    }

    pub async fn update_item(&self, id: i32, item: UpdateItem) -> AppResult<Item> {
        check_price(item.price)?;
        self.repository.items.update(id, &item).await
    }

    /// Delete an item; refused once copies have been minted
    pub async fn delete_item(&self, id: i32) -> AppResult<()> {
        self.repository.items.delete(id).await?;
        tracing::info!("Item {} deleted", id);
        Ok(())
    }

    /// Copies of an item ordered by serial
    pub async fn copies_for_item(&self, item_id: i32) -> AppResult<Vec<BookCopy>> {
        if !self.repository.items.exists(item_id).await? {
            return Err(AppError::NotFound(format!("Item with id {} not found", item_id)));
        }
        self.repository.copies.list_for_item(item_id).await
    }

    pub async fn get_copy(&self, id: i32) -> AppResult<BookCopy> {
        self.repository.copies.get_by_id(id).await
    }

    pub async fn subjects(&self) -> AppResult<Vec<Subject>> {
        self.repository.catalog.subjects().await
    }

    pub async fn checklist(&self) -> AppResult<Vec<ChecklistPart>> {
        self.repository.catalog.checklist().await
    }
}
