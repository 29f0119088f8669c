//! Loan model and related types

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

use super::condition::ConditionSnapshot;
use super::copy::{non_blank, CopyConditionPatch};
use crate::error::{AppError, AppResult};

/// Stored loan status. Overdue is derived, see [`LoanState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            other => Err(format!("Unknown loan status '{}'", other)),
        }
    }
}

impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Loan state as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanState {
    Active,
    Overdue,
    Returned,
}

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub borrower_id: i32,
    pub item_id: i32,
    /// Live copy: the original, unless a substitution happened
    pub copy_id: i32,
    /// Copy handed out when the loan was opened
    pub original_copy_id: i32,
    /// Substitute copy, set at most once
    pub replaced_by: Option<i32>,
    pub opened_on: NaiveDate,
    pub due_on: NaiveDate,
    pub returned_on: Option<NaiveDate>,
    pub status: LoanStatus,
    pub handout_condition: ConditionSnapshot,
    pub return_condition: ConditionSnapshot,
    pub handout_rating: Option<String>,
    pub return_rating: Option<String>,
    pub handout_notes: Option<String>,
    pub return_notes: Option<String>,
    /// Borrower acknowledged the usage rules
    pub rules_accepted: bool,
    pub amount_due: Decimal,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Computed fields (populated when queried with JOINs, None otherwise)
    #[sqlx(default)]
    #[serde(default)]
    pub copy_code: Option<String>,
}

impl Loan {
    pub fn state_on(&self, today: NaiveDate) -> LoanState {
        match self.status {
            LoanStatus::Returned => LoanState::Returned,
            LoanStatus::Active if self.due_on < today => LoanState::Overdue,
            LoanStatus::Active => LoanState::Active,
        }
    }

    /// Days until the due date (negative once overdue); `None` for returned loans
    pub fn days_remaining(&self, today: NaiveDate) -> Option<i64> {
        match self.status {
            LoanStatus::Returned => None,
            LoanStatus::Active => Some((self.due_on - today).num_days()),
        }
    }
}

/// Loan with its computed state for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub state: LoanState,
    pub days_remaining: Option<i64>,
}

impl LoanDetails {
    pub fn new(loan: Loan, today: NaiveDate) -> Self {
        Self {
            state: loan.state_on(today),
            days_remaining: loan.days_remaining(today),
            loan,
        }
    }
}

/// Open loan request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OpenLoan {
    pub borrower_id: Option<i32>,
    pub copy_id: Option<i32>,
    /// Must match the copy's item when given
    pub item_id: Option<i32>,
    /// Defaults to today
    pub opened_on: Option<NaiveDate>,
    /// Defaults to `opened_on` plus the configured loan duration
    pub due_on: Option<NaiveDate>,
    pub handout_condition: Option<ConditionSnapshot>,
    pub handout_rating: Option<String>,
    pub handout_notes: Option<String>,
    pub rules_accepted: Option<bool>,
}

/// Validated loan ready to be recorded
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub borrower_id: i32,
    pub copy_id: i32,
    pub item_hint: Option<i32>,
    pub opened_on: NaiveDate,
    pub due_on: NaiveDate,
    pub handout_condition: ConditionSnapshot,
    pub handout_rating: Option<String>,
    pub handout_notes: Option<String>,
    pub rules_accepted: bool,
}

impl OpenLoan {
    pub fn into_new_loan(self, today: NaiveDate, default_duration_days: i64) -> AppResult<NewLoan> {
        let (borrower_id, copy_id) = match (self.borrower_id, self.copy_id) {
            (Some(borrower_id), Some(copy_id)) => (borrower_id, copy_id),
            _ => {
                return Err(AppError::BadRequest(
                    "A borrower and a copy are required to open a loan".to_string(),
                ))
            }
        };

        let opened_on = self.opened_on.unwrap_or(today);
        let due_on = match self.due_on {
            Some(due_on) => due_on,
            None => opened_on
                .checked_add_signed(Duration::days(default_duration_days))
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "Loan date {} leaves no room for a due date",
                        opened_on
                    ))
                })?,
        };

        if due_on < opened_on {
            return Err(AppError::BadRequest(format!(
                "Due date {} is before the loan date {}",
                due_on, opened_on
            )));
        }

        Ok(NewLoan {
            borrower_id,
            copy_id,
            item_hint: self.item_id,
            opened_on,
            due_on,
            handout_condition: self.handout_condition.unwrap_or_default(),
            handout_rating: non_blank(self.handout_rating.as_deref()),
            handout_notes: non_blank(self.handout_notes.as_deref()),
            rules_accepted: self.rules_accepted.unwrap_or(false),
        })
    }
}

/// Partial loan update. Every field is optional; ratings and notes accept
/// `null` (or an empty string) to clear the stored value.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct LoanPatch {
    pub returned_on: Option<NaiveDate>,
    pub status: Option<LoanStatus>,
    pub return_condition: Option<ConditionSnapshot>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub return_rating: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub return_notes: Option<Option<String>>,
    pub amount_due: Option<Decimal>,
    pub paid: Option<bool>,
    pub rules_accepted: Option<bool>,
    pub handout_condition: Option<ConditionSnapshot>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub handout_rating: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>)]
    pub handout_notes: Option<Option<String>>,
    /// Swap the live copy for another available copy of the same item
    pub substitute_copy_id: Option<i32>,
}

impl LoanPatch {
    /// Blank strings become explicit clears
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.return_rating,
            &mut self.return_notes,
            &mut self.handout_rating,
            &mut self.handout_notes,
        ] {
            if let Some(value) = field.take() {
                *field = Some(non_blank(value.as_deref()));
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.returned_on.is_none()
            && self.status.is_none()
            && self.return_condition.is_none()
            && self.return_rating.is_none()
            && self.return_notes.is_none()
            && self.amount_due.is_none()
            && self.paid.is_none()
            && self.rules_accepted.is_none()
            && self.handout_condition.is_none()
            && self.handout_rating.is_none()
            && self.handout_notes.is_none()
            && self.substitute_copy_id.is_none()
    }

    /// Snapshots carried by the patch, for checklist validation
    pub fn snapshots(&self) -> Vec<&ConditionSnapshot> {
        self.handout_condition
            .iter()
            .chain(self.return_condition.iter())
            .collect()
    }

    /// Decide whether applying this patch to `current` closes the loan.
    ///
    /// The loan closes when the resulting status is `returned`, it had no return
    /// date yet, and this patch supplies one. Patches that would leave the loan
    /// half-closed are rejected so the copy flag and the loan never disagree.
    pub fn closes(&self, current: &Loan) -> AppResult<bool> {
        let next_status = self.status.unwrap_or(current.status);

        match (current.status, next_status) {
            (LoanStatus::Returned, LoanStatus::Active) => {
                return Err(AppError::Conflict(format!(
                    "Loan {} is already returned and cannot be reopened",
                    current.id
                )))
            }
            (LoanStatus::Active, LoanStatus::Returned) if self.returned_on.is_none() => {
                return Err(AppError::BadRequest(
                    "A return date is required to close a loan".to_string(),
                ))
            }
            (LoanStatus::Active, LoanStatus::Active) if self.returned_on.is_some() => {
                return Err(AppError::BadRequest(
                    "A return date can only be set together with status 'returned'".to_string(),
                ))
            }
            _ => {}
        }

        if let Some(returned_on) = self.returned_on {
            let opened_on = current.opened_on;
            if returned_on < opened_on {
                return Err(AppError::BadRequest(format!(
                    "Return date {} is before the loan date {}",
                    returned_on, opened_on
                )));
            }
        }

        Ok(next_status == LoanStatus::Returned
            && current.returned_on.is_none()
            && self.returned_on.is_some())
    }

    pub fn has_handout_fields(&self) -> bool {
        self.handout_condition.is_some()
            || matches!(self.handout_rating, Some(Some(_)))
            || matches!(self.handout_notes, Some(Some(_)))
    }

    pub fn has_return_fields(&self) -> bool {
        self.return_condition.is_some()
            || matches!(self.return_rating, Some(Some(_)))
            || matches!(self.return_notes, Some(Some(_)))
    }

    /// Hand-out side of the patch as a merge onto a copy's mirror
    pub fn copy_handout_patch(&self) -> CopyConditionPatch {
        CopyConditionPatch {
            handout_condition: self.handout_condition.clone(),
            handout_rating: self.handout_rating.clone().flatten(),
            notes: self.handout_notes.clone().flatten(),
            ..Default::default()
        }
    }

    /// Return side of the patch as a merge onto a copy's mirror
    pub fn copy_return_patch(&self) -> CopyConditionPatch {
        CopyConditionPatch {
            return_condition: self.return_condition.clone(),
            return_rating: self.return_rating.clone().flatten(),
            notes: self.return_notes.clone().flatten(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_loan() -> Loan {
    let opened_on = NaiveDate::from_ymd_opt(2025, 9, 15).unwrap();
    Loan {
        id: 7,
        borrower_id: 3,
        item_id: 1,
        copy_id: 10,
        original_copy_id: 10,
        replaced_by: None,
        opened_on,
        due_on: opened_on + Duration::days(15),
        returned_on: None,
        status: LoanStatus::Active,
        handout_condition: ConditionSnapshot::new(),
        return_condition: ConditionSnapshot::new(),
        handout_rating: None,
        return_rating: None,
        handout_notes: None,
        return_notes: None,
        rules_accepted: true,
        amount_due: Decimal::ZERO,
        paid: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        copy_code: Some("GEN-ATL-001".to_string()),
    }
}
