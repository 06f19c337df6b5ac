//! # Inventory Repository
//!
//! Database operations for stocked ingredients and consumables.
//!
//! ## Versioned Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  read   SELECT ... version = 7                                          │
//! │  plan   (pure, tally-core)                                              │
//! │  write  UPDATE inventory_items                                          │
//! │           SET stock = ?, unit_cost = ?, version = version + 1           │
//! │         WHERE id = ? AND version = 7                                    │
//! │                                                                         │
//! │  1 row  → applied                                                       │
//! │  0 rows → someone else wrote first → DbError::Conflict (retry)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock and unit cost are never written any other way; metadata edits
//! (name, unit, min_stock) also bump the version so an in-flight plan built
//! on the old row is rejected.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::{InventoryItem, Money, StockUnit};

/// Repository for inventory item database operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Gets an inventory item by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, name, unit, stock, unit_cost, min_stock, version, created_at, updated_at
            FROM inventory_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Gets an inventory item by ID inside an open store transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, name, unit, stock, unit_cost, min_stock, version, created_at, updated_at
            FROM inventory_items
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(item)
    }

    /// Lists all inventory items by name.
    pub async fn list(&self) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, name, unit, stock, unit_cost, min_stock, version, created_at, updated_at
            FROM inventory_items
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists items whose stock is below their reorder threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(
            r#"
            SELECT id, name, unit, stock, unit_cost, min_stock, version, created_at, updated_at
            FROM inventory_items
            WHERE stock < min_stock
            ORDER BY stock - min_stock, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Listed low-stock items");
        Ok(items)
    }

    /// Inserts a new inventory item.
    pub async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(id = %item.id, name = %item.name, "Inserting inventory item");

        sqlx::query(
            r#"
            INSERT INTO inventory_items (
                id, name, unit, stock, unit_cost, min_stock, version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.unit)
        .bind(item.stock)
        .bind(item.unit_cost)
        .bind(item.min_stock)
        .bind(item.version)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates name, unit and reorder threshold. Never touches stock or cost.
    pub async fn update_metadata(
        &self,
        id: &str,
        name: &str,
        unit: StockUnit,
        min_stock: i64,
    ) -> DbResult<()> {
        debug!(id = %id, "Updating inventory item metadata");

        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                name = ?2,
                unit = ?3,
                min_stock = ?4,
                version = version + 1,
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(unit)
        .bind(min_stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", id));
        }

        Ok(())
    }

    /// Writes new stock and unit cost if the row is still at `expected_version`.
    ///
    /// ## Returns
    /// * `Ok(())` - Applied, version incremented
    /// * `Err(DbError::Conflict)` - Row changed since it was read
    pub async fn compare_and_set(
        conn: &mut SqliteConnection,
        id: &str,
        stock: i64,
        unit_cost: Money,
        expected_version: i64,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_items SET
                stock = ?2,
                unit_cost = ?3,
                version = version + 1,
                updated_at = ?4
            WHERE id = ?1 AND version = ?5
            "#,
        )
        .bind(id)
        .bind(stock)
        .bind(unit_cost)
        .bind(Utc::now())
        .bind(expected_version)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            warn!(item_id = %id, expected_version, "Inventory version moved, write rejected");
            return Err(DbError::conflict("InventoryItem", id));
        }

        Ok(())
    }

    /// Deletes an inventory item.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting inventory item");

        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", id));
        }

        Ok(())
    }

    /// Counts inventory items (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new inventory item ID.
pub fn generate_inventory_item_id() -> String {
    Uuid::new_v4().to_string()
}
