//! Borrower management service

use crate::{
    error::AppResult,
    models::borrower::{Borrower, CreateBorrower},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowersService {
    repository: Repository,
}

impl BorrowersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Borrower>> {
        self.repository.borrowers.list().await
    }

    pub async fn create(&self, borrower: CreateBorrower) -> AppResult<Borrower> {
        let created = self.repository.borrowers.create(&borrower).await?;
        tracing::info!("Borrower {} registered ({})", created.id, created.student_number);
        Ok(created)
    }
}
