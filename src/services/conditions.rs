//! Condition snapshot validation against the checklist catalog

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{ChecklistPart, ConditionSnapshot},
};

/// Where the checklist comes from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChecklistSource: Send + Sync {
    async fn checklist_parts(&self) -> AppResult<Vec<ChecklistPart>>;
}

#[derive(Clone)]
pub struct ConditionValidator {
    source: Arc<dyn ChecklistSource>,
}

impl ConditionValidator {
    pub fn new(source: Arc<dyn ChecklistSource>) -> Self {
        Self { source }
    }

    /// Validate snapshots; the checklist is only loaded when one has entries
    pub async fn validate(&self, snapshots: &[&ConditionSnapshot]) -> AppResult<()> {
        if snapshots.iter().all(|s| s.is_empty()) {
            return Ok(());
        }

        let parts = self.source.checklist_parts().await?;
        for snapshot in snapshots {
            snapshot.validate_against(&parts)?;
        }
        Ok(())
    }
}
