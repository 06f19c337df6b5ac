//! # Restock Repository
//!
//! Append-only audit trail of restock revaluations. Written in the same
//! store transaction as the inventory compare-and-swap it describes.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::RestockEvent;

/// Repository for restock event database operations.
#[derive(Debug, Clone)]
pub struct RestockRepository {
    pool: SqlitePool,
}

impl RestockRepository {
    /// Creates a new RestockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RestockRepository { pool }
    }

    /// Appends a restock event.
    pub async fn insert(conn: &mut SqliteConnection, event: &RestockEvent) -> DbResult<()> {
        debug!(id = %event.id, item_id = %event.inventory_item_id, qty = event.qty, "Recording restock");

        sqlx::query(
            r#"
            INSERT INTO restock_events (
                id, inventory_item_id, qty, total_cost,
                unit_cost_before, unit_cost_after, stock_after, timestamp
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&event.id)
        .bind(&event.inventory_item_id)
        .bind(event.qty)
        .bind(event.total_cost)
        .bind(event.unit_cost_before)
        .bind(event.unit_cost_after)
        .bind(event.stock_after)
        .bind(event.timestamp)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Restocks with `from <= timestamp < until`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<RestockEvent>> {
        let events = sqlx::query_as::<_, RestockEvent>(
            r#"
            SELECT id, inventory_item_id, qty, total_cost,
                   unit_cost_before, unit_cost_after, stock_after, timestamp
            FROM restock_events
            WHERE timestamp >= ?1 AND timestamp < ?2
            ORDER BY timestamp, rowid
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Restock history of one item, oldest first.
    pub async fn list_for_item(&self, inventory_item_id: &str) -> DbResult<Vec<RestockEvent>> {
        let events = sqlx::query_as::<_, RestockEvent>(
            r#"
            SELECT id, inventory_item_id, qty, total_cost,
                   unit_cost_before, unit_cost_after, stock_after, timestamp
            FROM restock_events
            WHERE inventory_item_id = ?1
            ORDER BY timestamp, rowid
            "#,
        )
        .bind(inventory_item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

/// Helper to generate a new restock event ID.
pub fn generate_restock_id() -> String {
    Uuid::new_v4().to_string()
}
