//! Items repository for database operations

use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        inventory::CounterDrift,
        item::{CreateItem, Item, MintSource, UpdateItem},
    },
};

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.title, i.author, i.isbn, i.publisher, i.course, i.subject_id,
           i.price, i.total_copies, i.available_copies, i.created_at,
           s.name AS subject_name
    FROM items i
    LEFT JOIN subjects s ON s.id = i.subject_id
"#;

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // READ
    // =========================================================================

    /// List all items ordered by title
    pub async fn list(&self) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!("{} ORDER BY i.title, i.id", ITEM_SELECT))
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>(&format!("{} WHERE i.id = $1", ITEM_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM items WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // =========================================================================
    // WRITE (catalog metadata)
    // =========================================================================

    /// Create an item with zeroed counters
    pub async fn create(&self, item: &CreateItem) -> AppResult<Item> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO items (title, author, isbn, publisher, course, subject_id, price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(item.title.trim())
        .bind(&item.author)
        .bind(&item.isbn)
        .bind(&item.publisher)
        .bind(&item.course)
        .bind(item.subject_id)
        .bind(item.price.unwrap_or(Decimal::ZERO))
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Update item metadata. Counters are owned by the inventory coordinator.
    pub async fn update(&self, id: i32, item: &UpdateItem) -> AppResult<Item> {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                title = COALESCE($1, title),
                author = COALESCE($2, author),
                isbn = COALESCE($3, isbn),
                publisher = COALESCE($4, publisher),
                course = COALESCE($5, course),
                subject_id = COALESCE($6, subject_id),
                price = COALESCE($7, price)
            WHERE id = $8
            "#,
        )
        .bind(item.title.as_deref().map(str::trim))
        .bind(&item.author)
        .bind(&item.isbn)
        .bind(&item.publisher)
        .bind(&item.course)
        .bind(item.subject_id)
        .bind(item.price)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }

        self.get_by_id(id).await
    }

    /// Delete an item that has never had copies minted.
    /// The item row is locked first so a concurrent mint either finishes
    /// before the copy check or finds the item gone.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<i32> =
            sqlx::query_scalar("SELECT id FROM items WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }

        let has_copies: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM copies WHERE item_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_copies {
            return Err(AppError::Conflict(format!(
                "Item {} has copies and cannot be deleted",
                id
            )));
        }

        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // TRANSACTIONAL (counters)
    // =========================================================================

    /// Lock the item row and read what copy codes are built from.
    /// The course falls back to the subject's course.
    pub async fn lock_for_mint(
        &self,
        conn: &mut PgConnection,
        id: i32,
    ) -> AppResult<Option<MintSource>> {
        let source = sqlx::query_as::<_, MintSource>(
            r#"
            SELECT i.title, COALESCE(NULLIF(i.course, ''), s.course) AS course
            FROM items i
            LEFT JOIN subjects s ON s.id = i.subject_id
            WHERE i.id = $1
            FOR UPDATE OF i
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(source)
    }

    /// Count freshly minted (available) copies
    pub async fn add_minted(&self, conn: &mut PgConnection, id: i32, count: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE items SET
                total_copies = total_copies + $1,
                available_copies = available_copies + $1
            WHERE id = $2
            "#,
        )
        .bind(count)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Move the available counter by `delta`, never below zero
    pub async fn adjust_available(
        &self,
        conn: &mut PgConnection,
        id: i32,
        delta: i32,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE items SET available_copies = GREATEST(available_copies + $1, 0) WHERE id = $2",
        )
        .bind(delta)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Lock the selected items (all when `item_id` is `None`), recount their
    /// copies and overwrite the cached counters. Returns one entry per item checked.
    pub async fn recount(
        &self,
        conn: &mut PgConnection,
        item_id: Option<i32>,
    ) -> AppResult<Vec<CounterDrift>> {
        let locked: Vec<i32> = sqlx::query_scalar(
            "SELECT id FROM items WHERE ($1::int IS NULL OR id = $1) ORDER BY id FOR UPDATE",
        )
        .bind(item_id)
        .fetch_all(&mut *conn)
        .await?;

        if let Some(id) = item_id {
            if locked.is_empty() {
                return Err(AppError::NotFound(format!("Item with id {} not found", id)));
            }
        }

        let counts = sqlx::query_as::<_, CounterDrift>(
            r#"
            SELECT i.id AS item_id,
                   i.total_copies AS stored_total,
                   i.available_copies AS stored_available,
                   COUNT(c.id)::int AS counted_total,
                   (COUNT(c.id) FILTER (WHERE c.available))::int AS counted_available
            FROM items i
            LEFT JOIN copies c ON c.item_id = i.id
            WHERE i.id = ANY($1)
            GROUP BY i.id, i.total_copies, i.available_copies
            ORDER BY i.id
            "#,
        )
        .bind(&locked)
        .fetch_all(&mut *conn)
        .await?;

        for drift in counts.iter().filter(|c| c.has_drift()) {
            sqlx::query("UPDATE items SET total_copies = $1, available_copies = $2 WHERE id = $3")
                .bind(drift.counted_total)
                .bind(drift.counted_available)
                .bind(drift.item_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(counts)
    }
}
