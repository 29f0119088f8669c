//! Business logic services

pub mod borrowers;
pub mod catalog;
pub mod conditions;
pub mod inventory;
pub mod loans;

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub inventory: inventory::InventoryService,
    pub loans: loans::LoansService,
    pub borrowers: borrowers::BorrowersService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let conditions =
            conditions::ConditionValidator::new(Arc::new(repository.catalog.clone()));

        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            inventory: inventory::InventoryService::new(
                repository.clone(),
                conditions,
                config.database.lock_timeout_ms,
                config.loans.default_duration_days,
                config.copies.max_batch,
            ),
            loans: loans::LoansService::new(repository.clone()),
            borrowers: borrowers::BorrowersService::new(repository.clone()),
            repository,
        }
    }

    /// Round-trip to the database
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.repository.pool).await?;
        Ok(())
    }
}

/// Local calendar date loans are opened and checked against
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
