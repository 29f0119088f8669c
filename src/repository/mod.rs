//! Repository layer for database operations

pub mod borrowers;
pub mod catalog;
pub mod copies;
pub mod items;
pub mod loans;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub items: items::ItemsRepository,
    pub copies: copies::CopiesRepository,
    pub loans: loans::LoansRepository,
    pub catalog: catalog::CatalogRepository,
    pub borrowers: borrowers::BorrowersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            items: items::ItemsRepository::new(pool.clone()),
            copies: copies::CopiesRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            catalog: catalog::CatalogRepository::new(pool.clone()),
            borrowers: borrowers::BorrowersRepository::new(pool.clone()),
            pool,
        }
    }
}
