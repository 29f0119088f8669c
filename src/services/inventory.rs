//! Inventory coordinator
//!
//! Every operation that touches more than one of copies, loans and item
//! counters runs here, as a single transaction. Rows are locked in the order
//! loan → copy → item; minting locks only the item.

use sqlx::{PgConnection, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::{code_prefix, copy_code, BookCopy, UpdateCopy},
        inventory::ReconcileReport,
        loan::{Loan, LoanDetails, LoanPatch, LoanStatus, OpenLoan},
    },
    repository::Repository,
};

use super::{conditions::ConditionValidator, today};

/// Code collisions tolerated in one mint before it gives up
const MAX_CODE_ATTEMPTS: u32 = 10;

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
    conditions: ConditionValidator,
    lock_timeout_ms: u64,
    default_duration_days: i64,
    max_batch: i32,
}

impl InventoryService {
    pub fn new(
        repository: Repository,
        conditions: ConditionValidator,
        lock_timeout_ms: u64,
        default_duration_days: i64,
        max_batch: i32,
    ) -> Self {
        Self {
            repository,
            conditions,
            lock_timeout_ms,
            default_duration_days,
            max_batch,
        }
    }

    /// Begin a transaction with the configured lock timeout
    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.repository.pool.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;
        Ok(tx)
    }

    // =========================================================================
    // COPIES
    // =========================================================================

    /// Mint `count` new available copies of an item with consecutive serials
    pub async fn mint_copies(&self, item_id: i32, count: i32) -> AppResult<Vec<BookCopy>> {
        if count < 1 || count > self.max_batch {
            return Err(AppError::Validation(format!(
                "Copy count must be between 1 and {}",
                self.max_batch
            )));
        }

        let mut tx = self.begin().await?;

        let source = self
            .repository
            .items
            .lock_for_mint(&mut tx, item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;

        let prefix = code_prefix(source.course.as_deref(), &source.title);
        let mut serial = self.repository.copies.max_serial(&mut tx, item_id).await? + 1;
        let mut created = Vec::with_capacity(count as usize);
        let mut collisions = 0;

        while created.len() < count as usize {
            let code = copy_code(source.course.as_deref(), &source.title, serial);
            match self
                .repository
                .copies
                .try_insert(&mut tx, item_id, &code, serial)
                .await?
            {
                Some(copy) => {
                    created.push(copy);
                    serial += 1;
                }
                None => {
                    collisions += 1;
                    if collisions >= MAX_CODE_ATTEMPTS {
                        return Err(AppError::Conflict(format!(
                            "Could not find a free copy code for item {}",
                            item_id
                        )));
                    }
                    // Another item owns codes under this prefix; skip past all of them
                    let taken = self
                        .repository
                        .copies
                        .max_code_suffix(&mut tx, &prefix)
                        .await?;
                    tracing::debug!(
                        "Copy code {} already taken, continuing after {}{:03}",
                        code,
                        prefix,
                        taken
                    );
                    serial = serial.max(taken) + 1;
                }
            }
        }

        self.repository.items.add_minted(&mut tx, item_id, count).await?;
        tx.commit().await?;

        tracing::info!(
            "Minted {} copies of item {} ({} .. {})",
            count,
            item_id,
            created.first().map(|c| c.code.as_str()).unwrap_or_default(),
            created.last().map(|c| c.code.as_str()).unwrap_or_default()
        );

        Ok(created)
    }

    /// Partial copy update: condition merge plus manual retire / restore
    pub async fn update_copy(&self, copy_id: i32, update: UpdateCopy) -> AppResult<BookCopy> {
        let patch = update.condition_patch();
        if patch.is_empty() && update.available.is_none() {
            return Err(AppError::BadRequest("No copy fields to update".to_string()));
        }

        let snapshots: Vec<_> = patch
            .handout_condition
            .iter()
            .chain(patch.return_condition.iter())
            .collect();
        self.conditions.validate(&snapshots).await?;

        let mut tx = self.begin().await?;

        let copy = self
            .repository
            .copies
            .lock(&mut tx, copy_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", copy_id)))?;

        if let Some(available) = update.available.filter(|a| *a != copy.available) {
            if available && self.repository.loans.active_for_copy(&mut tx, copy_id).await? {
                tracing::warn!("Refused to restore copy {} while it is on loan", copy.code);
                return Err(AppError::Conflict(format!(
                    "Copy {} is on an active loan",
                    copy.code
                )));
            }

            self.repository
                .copies
                .set_availability(&mut tx, copy_id, available)
                .await?;
            self.repository
                .items
                .adjust_available(&mut tx, copy.item_id, if available { 1 } else { -1 })
                .await?;

            tracing::info!(
                "Copy {} {}",
                copy.code,
                if available { "restored" } else { "retired" }
            );
        }

        let copy = if patch.is_empty() {
            self.repository.copies.fetch(&mut tx, copy_id).await?
        } else {
            self.repository
                .copies
                .merge_condition(&mut tx, copy_id, &patch)
                .await?
        };

        tx.commit().await?;
        Ok(copy)
    }

    // =========================================================================
    // LOANS
    // =========================================================================

    /// Hand a copy out: record the loan, take the copy off the shelf and
    /// decrement the item's available counter
    pub async fn open_loan(&self, request: OpenLoan) -> AppResult<LoanDetails> {
        let today = today();
        let new_loan = request.into_new_loan(today, self.default_duration_days)?;
        self.conditions
            .validate(&[&new_loan.handout_condition])
            .await?;

        let mut tx = self.begin().await?;

        let copy = self
            .repository
            .copies
            .lock(&mut tx, new_loan.copy_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Copy with id {} not found", new_loan.copy_id))
            })?;

        if !copy.available {
            tracing::warn!("Copy {} requested while unavailable", copy.code);
            return Err(AppError::Conflict(format!(
                "Copy {} is not available",
                copy.code
            )));
        }

        if let Some(item_id) = new_loan.item_hint.filter(|id| *id != copy.item_id) {
            return Err(AppError::BadRequest(format!(
                "Copy {} does not belong to item {}",
                copy.code, item_id
            )));
        }

        if !self
            .repository
            .borrowers
            .exists(&mut tx, new_loan.borrower_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "Borrower with id {} not found",
                new_loan.borrower_id
            )));
        }

        let loan_id = self
            .repository
            .loans
            .insert(&mut tx, &new_loan, copy.item_id)
            .await?;

        self.repository
            .copies
            .mark_handed_out(
                &mut tx,
                copy.id,
                &new_loan.handout_condition,
                new_loan.handout_rating.as_deref(),
                new_loan.handout_notes.as_deref(),
            )
            .await?;
        self.repository
            .items
            .adjust_available(&mut tx, copy.item_id, -1)
            .await?;

        let loan = self.repository.loans.fetch(&mut tx, loan_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Loan {} opened: copy {} to borrower {}, due {}",
            loan.id,
            copy.code,
            loan.borrower_id,
            loan.due_on
        );

        Ok(LoanDetails::new(loan, today))
    }

    /// Apply a partial update to a loan, handling substitution and the
    /// first return
    pub async fn update_loan(&self, loan_id: i32, patch: LoanPatch) -> AppResult<LoanDetails> {
        let patch = patch.normalized();
        if patch.is_empty() {
            return Err(AppError::BadRequest("No loan fields to update".to_string()));
        }
        if patch.amount_due.is_some_and(|a| a.is_sign_negative() && !a.is_zero()) {
            return Err(AppError::Validation(
                "Amount due cannot be negative".to_string(),
            ));
        }
        self.conditions.validate(&patch.snapshots()).await?;

        let mut tx = self.begin().await?;

        let loan = self
            .repository
            .loans
            .lock(&mut tx, loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;

        let closing = patch.closes(&loan)?;

        // Copy that was live before this update; return fields merge onto it
        let previous_copy_id = loan.copy_id;
        let mut live_copy_id = loan.copy_id;

        if let Some(substitute_id) = patch.substitute_copy_id {
            ensure_substitutable(&loan)?;

            let substitute = self
                .repository
                .copies
                .lock(&mut tx, substitute_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Copy with id {} not found", substitute_id))
                })?;
            check_substitute(&loan, &substitute)?;

            self.repository
                .copies
                .set_availability(&mut tx, substitute_id, false)
                .await?;
            self.repository
                .items
                .adjust_available(&mut tx, loan.item_id, -1)
                .await?;
            live_copy_id = substitute_id;

            tracing::info!(
                "Loan {}: copy {} replaced by {}",
                loan.id,
                previous_copy_id,
                substitute.code
            );
        }

        self.repository
            .loans
            .apply_patch(&mut tx, loan_id, &patch)
            .await?;

        if closing {
            let closed = self.repository.loans.fetch(&mut tx, loan_id).await?;
            self.repository
                .copies
                .mark_returned(
                    &mut tx,
                    live_copy_id,
                    &closed.return_condition,
                    closed.return_rating.as_deref(),
                    closed.return_notes.as_deref(),
                )
                .await?;
            self.repository
                .items
                .adjust_available(&mut tx, loan.item_id, 1)
                .await?;
        }

        if patch.has_handout_fields() {
            self.repository
                .copies
                .merge_condition(&mut tx, live_copy_id, &patch.copy_handout_patch())
                .await?;
        }

        if patch.has_return_fields() {
            self.repository
                .copies
                .merge_condition(&mut tx, previous_copy_id, &patch.copy_return_patch())
                .await?;
        }

        let updated = self.repository.loans.fetch(&mut tx, loan_id).await?;
        tx.commit().await?;

        if closing {
            tracing::info!(
                "Loan {} returned on {}",
                updated.id,
                updated
                    .returned_on
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            );
        }

        Ok(LoanDetails::new(updated, today()))
    }

    // =========================================================================
    // COUNTERS
    // =========================================================================

    /// Recount copies and overwrite drifted item counters
    pub async fn reconcile(&self, item_id: Option<i32>) -> AppResult<ReconcileReport> {
        let mut tx = self.begin().await?;
        let counts = self.repository.items.recount(&mut tx, item_id).await?;
        tx.commit().await?;

        let checked = counts.len();
        let repaired: Vec<_> = counts.into_iter().filter(|c| c.has_drift()).collect();

        for drift in &repaired {
            tracing::warn!(
                "Item {} counters drifted: total {} -> {}, available {} -> {}",
                drift.item_id,
                drift.stored_total,
                drift.counted_total,
                drift.stored_available,
                drift.counted_available
            );
        }

        Ok(ReconcileReport { checked, repaired })
    }
}

async fn set_lock_timeout(conn: &mut PgConnection, lock_timeout_ms: u64) -> AppResult<()> {
    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout_ms))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// A loan accepts one substitution while it is active
fn ensure_substitutable(loan: &Loan) -> AppResult<()> {
    if loan.status == LoanStatus::Returned {
        return Err(AppError::Conflict(format!(
            "Loan {} is returned; its copy cannot be substituted",
            loan.id
        )));
    }
    if let Some(replaced_by) = loan.replaced_by {
        return Err(AppError::Conflict(format!(
            "Loan {} was already substituted with copy {}",
            loan.id, replaced_by
        )));
    }
    Ok(())
}

/// The substitute must be another available copy of the same item
fn check_substitute(loan: &Loan, substitute: &BookCopy) -> AppResult<()> {
    if substitute.item_id != loan.item_id {
        return Err(AppError::BadRequest(format!(
            "Copy {} belongs to another item",
            substitute.code
        )));
    }
    if !substitute.available {
        return Err(AppError::Conflict(format!(
            "Copy {} is not available",
            substitute.code
        )));
    }
    Ok(())
}
