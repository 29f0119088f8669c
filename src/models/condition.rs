//! Condition snapshots and the checklist they are validated against

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// One checklist part (e.g. "Cubierta") and the options an inspector may pick for it
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ChecklistPart {
    pub id: i32,
    pub name: String,
    pub options: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Part name → selected option, captured at hand-out or return time.
///
/// Stored as JSONB. Entry order is preserved so reports list parts the way
/// they were filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct ConditionSnapshot(IndexMap<String, String>);

impl ConditionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, part: &str) -> Option<&str> {
        self.0.get(part).map(String::as_str)
    }

    pub fn insert(&mut self, part: impl Into<String>, option: impl Into<String>) {
        self.0.insert(part.into(), option.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check every entry against the checklist: unknown parts and options outside
    /// a part's list are rejected.
    pub fn validate_against(&self, parts: &[ChecklistPart]) -> AppResult<()> {
        for (part_name, option) in self.iter() {
            let part = parts
                .iter()
                .find(|p| p.name == part_name)
                .ok_or_else(|| {
                    AppError::Validation(format!("Unknown checklist part '{}'", part_name))
                })?;

            if !part.options.iter().any(|o| o == option) {
                return Err(AppError::Validation(format!(
                    "Option '{}' is not allowed for part '{}' (expected one of: {})",
                    option,
                    part_name,
                    part.options.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConditionSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl sqlx::Type<Postgres> for ConditionSnapshot {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Json<IndexMap<String, String>> as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Json<IndexMap<String, String>> as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for ConditionSnapshot {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let Json(entries) = <Json<IndexMap<String, String>> as Decode<Postgres>>::decode(value)?;
        Ok(Self(entries))
    }
}

impl Encode<'_, Postgres> for ConditionSnapshot {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <Json<&IndexMap<String, String>> as Encode<Postgres>>::encode(Json(&self.0), buf)
    }
}

#[cfg(test)]
pub(crate) fn default_checklist() -> Vec<ChecklistPart> {
    let grades = ["Excelente", "Bueno", "Revisar", "Sustituir"];
    let part = |id: i32, name: &str, options: &[&str]| ChecklistPart {
        id,
        name: name.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        created_at: Utc::now(),
    };
    vec![
        part(1, "Cubierta", &grades),
        part(2, "Lomo", &grades),
        part(3, "Páginas internas", &grades),
        part(4, "Anotaciones", &["Sin marcas", "Pocas anotaciones", "Revisar", "Sustituir"]),
    ]
}
