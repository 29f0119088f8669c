//! Copy registry: identity, codes and availability of physical copies
//!
//! Functions taking a `PgConnection` run inside the caller's transaction; the
//! inventory coordinator is the only caller allowed to change availability.

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        condition::ConditionSnapshot,
        copy::{BookCopy, CopyConditionPatch},
    },
};

const COPY_COLUMNS: &str = r#"
    id, item_id, code, serial, available,
    handout_condition, return_condition, handout_rating, return_rating, notes,
    created_at, updated_at
"#;

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// Copies of an item ordered by serial
    pub async fn list_for_item(&self, item_id: i32) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(&format!(
            "SELECT {} FROM copies WHERE item_id = $1 ORDER BY serial",
            COPY_COLUMNS
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(&format!("SELECT {} FROM copies WHERE id = $1", COPY_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    // =========================================================================
    // TRANSACTIONAL
    // =========================================================================

    /// Read a copy and take an exclusive row lock until the transaction ends
    pub async fn lock(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(&format!(
            "SELECT {} FROM copies WHERE id = $1 FOR UPDATE",
            COPY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Re-read a copy inside the transaction
    pub async fn fetch(&self, conn: &mut PgConnection, id: i32) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(&format!("SELECT {} FROM copies WHERE id = $1", COPY_COLUMNS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// Highest serial minted for an item, 0 when it has no copies
    pub async fn max_serial(&self, conn: &mut PgConnection, item_id: i32) -> AppResult<i32> {
        let serial: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(serial), 0) FROM copies WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&mut *conn)
                .await?;

        Ok(serial)
    }

    /// Highest numeric suffix among codes starting with `prefix`, whatever item owns them
    pub async fn max_code_suffix(&self, conn: &mut PgConnection, prefix: &str) -> AppResult<i32> {
        let suffix: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(substring(code FROM char_length($1) + 1)::INTEGER), 0)
            FROM copies
            WHERE starts_with(code, $1)
              AND substring(code FROM char_length($1) + 1) ~ '^[0-9]{1,9}$'
            "#,
        )
        .bind(prefix)
        .fetch_one(&mut *conn)
        .await?;

        Ok(suffix)
    }

    /// Insert an available copy. Returns `None` when `code` is already taken,
    /// leaving the transaction usable so the caller can try the next serial.
    pub async fn try_insert(
        &self,
        conn: &mut PgConnection,
        item_id: i32,
        code: &str,
        serial: i32,
    ) -> AppResult<Option<BookCopy>> {
        sqlx::query_as::<_, BookCopy>(&format!(
            r#"
            INSERT INTO copies (item_id, code, serial, available)
            VALUES ($1, $2, $3, true)
            ON CONFLICT (code) DO NOTHING
            RETURNING {}
            "#,
            COPY_COLUMNS
        ))
        .bind(item_id)
        .bind(code)
        .bind(serial)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| {
            AppError::unique_violation_as_conflict(
                e,
                &format!("Serial {} already exists for item {}", serial, item_id),
            )
        })
    }

    pub async fn set_availability(
        &self,
        conn: &mut PgConnection,
        id: i32,
        available: bool,
    ) -> AppResult<()> {
        sqlx::query("UPDATE copies SET available = $1 WHERE id = $2")
            .bind(available)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Take a copy off the shelf and record its hand-out state, replacing the
    /// previous hand-out mirror
    pub async fn mark_handed_out(
        &self,
        conn: &mut PgConnection,
        id: i32,
        condition: &ConditionSnapshot,
        rating: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE copies SET
                available = false,
                handout_condition = $1,
                handout_rating = $2,
                notes = $3
            WHERE id = $4
            "#,
        )
        .bind(condition)
        .bind(rating)
        .bind(notes)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Put a copy back on the shelf and record its return state
    pub async fn mark_returned(
        &self,
        conn: &mut PgConnection,
        id: i32,
        condition: &ConditionSnapshot,
        rating: Option<&str>,
        notes: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE copies SET
                available = true,
                return_condition = $1,
                return_rating = COALESCE($2, return_rating),
                notes = COALESCE($3, notes)
            WHERE id = $4
            "#,
        )
        .bind(condition)
        .bind(rating)
        .bind(notes)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Merge condition fields onto a copy; `None` keeps the stored value
    pub async fn merge_condition(
        &self,
        conn: &mut PgConnection,
        id: i32,
        patch: &CopyConditionPatch,
    ) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(&format!(
            r#"
            UPDATE copies SET
                handout_condition = COALESCE($1, handout_condition),
                return_condition = COALESCE($2, return_condition),
                handout_rating = COALESCE($3, handout_rating),
                return_rating = COALESCE($4, return_rating),
                notes = COALESCE($5, notes)
            WHERE id = $6
            RETURNING {}
            "#,
            COPY_COLUMNS
        ))
        .bind(&patch.handout_condition)
        .bind(&patch.return_condition)
        .bind(&patch.handout_rating)
        .bind(&patch.return_rating)
        .bind(&patch.notes)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }
}
