//! Copy (physical unit of an item) model and code generation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};
use utoipa::ToSchema;
use validator::Validate;

use super::condition::ConditionSnapshot;

/// Width of the course segment in a copy code
const SEGMENT_WIDTH: usize = 6;
/// Width of the title segment in a copy code
const TITLE_WIDTH: usize = 3;

/// One physical, individually coded copy of an item.
///
/// `handout_*` and `return_*` mirror the state recorded by the most recent loan
/// hand-out and return, so the copy shows its current physical condition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub id: i32,
    pub item_id: i32,
    /// Human-readable code, e.g. `1ESO-MAT-004`
    pub code: String,
    /// Per-item sequence number, never reused
    pub serial: i32,
    pub available: bool,
    pub handout_condition: ConditionSnapshot,
    pub return_condition: ConditionSnapshot,
    pub handout_rating: Option<String>,
    pub return_rating: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mint copies request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MintCopies {
    /// Number of copies to create (default 1)
    #[serde(default = "default_mint_count")]
    #[validate(range(min = 1, message = "At least one copy must be minted"))]
    pub count: i32,
}

fn default_mint_count() -> i32 {
    1
}

/// Update copy request. Omitted fields are left unchanged.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCopy {
    /// Manual retire (`false`) or restore (`true`)
    pub available: Option<bool>,
    pub handout_condition: Option<ConditionSnapshot>,
    pub return_condition: Option<ConditionSnapshot>,
    pub handout_rating: Option<String>,
    pub return_rating: Option<String>,
    pub notes: Option<String>,
}

impl UpdateCopy {
    pub fn condition_patch(&self) -> CopyConditionPatch {
        CopyConditionPatch {
            handout_condition: self.handout_condition.clone(),
            return_condition: self.return_condition.clone(),
            handout_rating: non_blank(self.handout_rating.as_deref()),
            return_rating: non_blank(self.return_rating.as_deref()),
            notes: non_blank(self.notes.as_deref()),
        }
    }
}

/// Merge onto a copy's condition mirror: `None` keeps the stored value
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CopyConditionPatch {
    pub handout_condition: Option<ConditionSnapshot>,
    pub return_condition: Option<ConditionSnapshot>,
    pub handout_rating: Option<String>,
    pub return_rating: Option<String>,
    pub notes: Option<String>,
}

impl CopyConditionPatch {
    pub fn is_empty(&self) -> bool {
        self.handout_condition.is_none()
            && self.return_condition.is_none()
            && self.handout_rating.is_none()
            && self.return_rating.is_none()
            && self.notes.is_none()
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reduce free text to an uppercase ASCII code segment.
///
/// Accents are stripped (`Matemáticas` → `MATEMA`), anything that is not an
/// ASCII letter or digit is dropped, and the result is cut to six characters.
/// Returns `fallback` when nothing survives.
pub fn sanitize_segment(value: Option<&str>, fallback: &str) -> String {
    let cleaned: String = value
        .unwrap_or_default()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(SEGMENT_WIDTH)
        .collect();

    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Leading part shared by every code of a course and title: `<course>-<title(3)>-`
pub fn code_prefix(course: Option<&str>, title: &str) -> String {
    let course_segment = sanitize_segment(course, "GEN");
    let title_segment: String = format!("{}XXX", sanitize_segment(Some(title), "LIB"))
        .chars()
        .take(TITLE_WIDTH)
        .collect();

    format!("{}-{}-", course_segment, title_segment)
}

/// Build a copy code: `<course>-<title(3)>-<serial:03>`
pub fn copy_code(course: Option<&str>, title: &str, serial: i32) -> String {
    format!("{}{:03}", code_prefix(course, title), serial)
}
