//! Data models for Bookbank

pub mod borrower;
pub mod condition;
pub mod copy;
pub mod inventory;
pub mod item;
pub mod loan;
pub mod subject;

// Re-export commonly used types
pub use borrower::Borrower;
pub use condition::{ChecklistPart, ConditionSnapshot};
pub use copy::BookCopy;
pub use item::Item;
pub use loan::{Loan, LoanDetails, LoanPatch, LoanStatus};
pub use subject::Subject;
