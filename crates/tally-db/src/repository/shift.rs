//! # Shift Repository
//!
//! Database operations for cash-register shifts.
//!
//! ## Guards
//! ```text
//! insert            partial UNIQUE index (cashier_id) WHERE status = 'OPEN'
//!                   → second open shift fails with UniqueViolation
//! add_expected_cash WHERE id = ? AND status = 'OPEN'
//! close             WHERE id = ? AND status = 'OPEN' AND expected_cash = ?
//!                   → a sale committed between read and close is never lost
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{Money, Shift};

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    /// Gets a shift by ID inside an open store transaction.
    pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, cashier_id, start_time, start_cash, expected_cash, status,
                   end_time, actual_cash, difference, notes
            FROM shifts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(shift)
    }

    /// The cashier's OPEN shift, if any.
    pub async fn find_open_for_cashier(&self, cashier_id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, cashier_id, start_time, start_cash, expected_cash, status,
                   end_time, actual_cash, difference, notes
            FROM shifts
            WHERE cashier_id = ?1 AND status = 'OPEN'
            "#,
        )
        .bind(cashier_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Shifts started by a cashier, newest first.
    pub async fn list_for_cashier(&self, cashier_id: &str) -> DbResult<Vec<Shift>> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT id, cashier_id, start_time, start_cash, expected_cash, status,
                   end_time, actual_cash, difference, notes
            FROM shifts
            WHERE cashier_id = ?1
            ORDER BY start_time DESC, rowid DESC
            "#,
        )
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Inserts a new shift.
    pub async fn insert(&self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, cashier_id = %shift.cashier_id, "Inserting shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, cashier_id, start_time, start_cash, expected_cash, status,
                end_time, actual_cash, difference, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.cashier_id)
        .bind(shift.start_time)
        .bind(shift.start_cash)
        .bind(shift.expected_cash)
        .bind(shift.status)
        .bind(shift.end_time)
        .bind(shift.actual_cash)
        .bind(shift.difference)
        .bind(&shift.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Adds a cash sale to an OPEN shift's expected cash.
    ///
    /// ## Known Limitation
    /// `amount` is the cash tendered (`amount_paid`), and the change handed
    /// back is not subtracted. A drawer counted exactly after a sale with
    /// change therefore closes short by that change; the `change` recorded
    /// on each cash transaction is what to reconcile the difference against.
    ///
    /// ## Returns
    /// `Ok(false)` if the shift is no longer OPEN.
    pub async fn add_expected_cash(
        conn: &mut SqliteConnection,
        shift_id: &str,
        amount: Money,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE shifts SET expected_cash = expected_cash + ?2
            WHERE id = ?1 AND status = 'OPEN'
            "#,
        )
        .bind(shift_id)
        .bind(amount)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Writes the closing fields of a shift closed in memory.
    ///
    /// Guarded on the shift still being OPEN with the `expected_cash` the
    /// difference was computed from.
    pub async fn close(&self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, "Closing shift");

        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                status = ?2,
                end_time = ?3,
                actual_cash = ?4,
                difference = ?5,
                notes = ?6
            WHERE id = ?1 AND status = 'OPEN' AND expected_cash = ?7
            "#,
        )
        .bind(&shift.id)
        .bind(shift.status)
        .bind(shift.end_time)
        .bind(shift.actual_cash)
        .bind(shift.difference)
        .bind(&shift.notes)
        .bind(shift.expected_cash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Shift", &shift.id));
        }

        Ok(())
    }
}
