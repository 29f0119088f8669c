//! Reference data: subjects and the condition checklist

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{ChecklistPart, Subject},
    services::conditions::ChecklistSource,
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: Pool<Postgres>,
}

impl CatalogRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn subjects(&self) -> AppResult<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            "SELECT id, name, course, elective, created_at FROM subjects ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(subjects)
    }

    /// Checklist parts in display order
    pub async fn checklist(&self) -> AppResult<Vec<ChecklistPart>> {
        let parts = sqlx::query_as::<_, ChecklistPart>(
            "SELECT id, name, options, created_at FROM checklist_parts ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(parts)
    }
}

#[async_trait]
impl ChecklistSource for CatalogRepository {
    async fn checklist_parts(&self) -> AppResult<Vec<ChecklistPart>> {
        self.checklist().await
    }
}
