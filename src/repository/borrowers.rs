//! Borrowers repository for database operations

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::borrower::{Borrower, CreateBorrower},
};

#[derive(Clone)]
pub struct BorrowersRepository {
    pool: Pool<Postgres>,
}

impl BorrowersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List borrowers ordered by name
    pub async fn list(&self) -> AppResult<Vec<Borrower>> {
        let borrowers = sqlx::query_as::<_, Borrower>(
            "SELECT id, student_number, name, course, created_at FROM borrowers ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(borrowers)
    }

    /// Create a borrower; student numbers are unique
    pub async fn create(&self, borrower: &CreateBorrower) -> AppResult<Borrower> {
        sqlx::query_as::<_, Borrower>(
            r#"
            INSERT INTO borrowers (student_number, name, course)
            VALUES ($1, $2, $3)
            RETURNING id, student_number, name, course, created_at
            "#,
        )
        .bind(borrower.student_number.trim())
        .bind(borrower.name.trim())
        .bind(&borrower.course)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::unique_violation_as_conflict(
                e,
                &format!(
                    "A borrower with student number {} already exists",
                    borrower.student_number.trim()
                ),
            )
        })
    }

    pub async fn exists(&self, conn: &mut PgConnection, id: i32) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM borrowers WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(exists)
    }
}
