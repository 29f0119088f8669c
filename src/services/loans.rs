//! Loan queries. Opening, updating and closing go through the inventory coordinator.

use crate::{
    error::AppResult,
    models::{inventory::InventorySummary, LoanDetails},
    repository::Repository,
};

use super::today;

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
}

impl LoansService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// All loans, newest first, with their computed state
    pub async fn list_loans(&self) -> AppResult<Vec<LoanDetails>> {
        let today = today();
        let loans = self.repository.loans.list().await?;
        Ok(loans
            .into_iter()
            .map(|loan| LoanDetails::new(loan, today))
            .collect())
    }

    pub async fn get_loan(&self, id: i32) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(id).await?;
        Ok(LoanDetails::new(loan, today()))
    }

    /// Dashboard figures
    pub async fn summary(&self) -> AppResult<InventorySummary> {
        self.repository.loans.summary(today()).await
    }
}
