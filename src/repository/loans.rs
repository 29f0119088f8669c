//! Loan ledger: the history of hand-outs, returns and substitutions

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        inventory::InventorySummary,
        loan::{Loan, LoanPatch, NewLoan},
    },
};

const LOAN_SELECT: &str = r#"
    SELECT l.*, c.code AS copy_code
    FROM loans l
    JOIN copies c ON c.id = l.copy_id
"#;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// All loans, newest first
    pub async fn list(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "{} ORDER BY l.created_at DESC, l.id DESC",
            LOAN_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Dashboard figures; loans due before `today` count as overdue
    pub async fn summary(&self, today: NaiveDate) -> AppResult<InventorySummary> {
        let summary = sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM items) AS items,
                (SELECT COUNT(*) FROM copies) AS copies_total,
                (SELECT COUNT(*) FROM copies WHERE available) AS copies_available,
                (SELECT COUNT(*) FROM loans WHERE status = 'active') AS loans_active,
                (SELECT COUNT(*) FROM loans WHERE status = 'active' AND due_on < $1) AS loans_overdue,
                (SELECT COUNT(*) FROM loans WHERE status = 'returned') AS loans_returned,
                (SELECT COALESCE(SUM(amount_due), 0) FROM loans WHERE NOT paid) AS outstanding_amount
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    // =========================================================================
    // TRANSACTIONAL
    // =========================================================================

    /// Read a loan row and lock it until the transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(loan)
    }

    /// Re-read a loan with its live copy code inside the transaction
    pub async fn fetch(&self, conn: &mut PgConnection, id: i32) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(&format!("{} WHERE l.id = $1", LOAN_SELECT))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Whether some active loan currently holds `copy_id` as its live copy
    pub async fn active_for_copy(&self, conn: &mut PgConnection, copy_id: i32) -> AppResult<bool> {
        let active: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE copy_id = $1 AND status = 'active')",
        )
        .bind(copy_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(active)
    }

    /// Record a freshly opened loan and return its id
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        loan: &NewLoan,
        item_id: i32,
    ) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO loans (
                borrower_id, item_id, copy_id, original_copy_id,
                opened_on, due_on, status,
                handout_condition, handout_rating, handout_notes, rules_accepted
            )
            VALUES ($1, $2, $3, $3, $4, $5, 'active', $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(loan.borrower_id)
        .bind(item_id)
        .bind(loan.copy_id)
        .bind(loan.opened_on)
        .bind(loan.due_on)
        .bind(&loan.handout_condition)
        .bind(&loan.handout_rating)
        .bind(&loan.handout_notes)
        .bind(loan.rules_accepted)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| {
            AppError::unique_violation_as_conflict(
                e,
                &format!("Copy {} is already on an active loan", loan.copy_id),
            )
        })
    }

    /// Write the fields present in `patch`. A substitute becomes the live copy
    /// and is remembered in `replaced_by`.
    pub async fn apply_patch(
        &self,
        conn: &mut PgConnection,
        id: i32,
        patch: &LoanPatch,
    ) -> AppResult<()> {
        let mut sets: Vec<String> = Vec::new();
        let mut idx = 1;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, idx));
                    idx += 1;
                }
            };
        }

        add_field!(patch.returned_on, "returned_on");
        add_field!(patch.status, "status");
        add_field!(patch.return_condition, "return_condition");
        add_field!(patch.return_rating, "return_rating");
        add_field!(patch.return_notes, "return_notes");
        add_field!(patch.amount_due, "amount_due");
        add_field!(patch.paid, "paid");
        add_field!(patch.rules_accepted, "rules_accepted");
        add_field!(patch.handout_condition, "handout_condition");
        add_field!(patch.handout_rating, "handout_rating");
        add_field!(patch.handout_notes, "handout_notes");
        if patch.substitute_copy_id.is_some() {
            sets.push(format!("copy_id = ${0}, replaced_by = ${0}", idx));
            idx += 1;
        }

        if sets.is_empty() {
            return Err(AppError::BadRequest("No loan fields to update".to_string()));
        }

        let query = format!("UPDATE loans SET {} WHERE id = ${}", sets.join(", "), idx);

        let mut builder = sqlx::query(&query);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(patch.returned_on);
        bind_field!(patch.status);
        bind_field!(patch.return_condition);
        bind_field!(patch.return_rating);
        bind_field!(patch.return_notes);
        bind_field!(patch.amount_due);
        bind_field!(patch.paid);
        bind_field!(patch.rules_accepted);
        bind_field!(patch.handout_condition);
        bind_field!(patch.handout_rating);
        bind_field!(patch.handout_notes);
        bind_field!(patch.substitute_copy_id);

        let result = builder
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                AppError::unique_violation_as_conflict(
                    e,
                    "Substitute copy is already on an active loan",
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }

        Ok(())
    }
}
