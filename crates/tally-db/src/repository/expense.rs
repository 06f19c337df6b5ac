//! # Expense Repository
//!
//! Operating expenses that are not restocks (rent, utilities, wages).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use tally_core::Expense;

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    /// Creates a new ExpenseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Records an expense.
    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        debug!(id = %expense.id, total_cost = %expense.total_cost, "Recording expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (id, description, total_cost, incurred_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.description)
        .bind(expense.total_cost)
        .bind(expense.incurred_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Expenses with `from <= incurred_at < until`, oldest first.
    pub async fn list_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, description, total_cost, incurred_at
            FROM expenses
            WHERE incurred_at >= ?1 AND incurred_at < ?2
            ORDER BY incurred_at, rowid
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    /// Counts expenses (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM expenses")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
