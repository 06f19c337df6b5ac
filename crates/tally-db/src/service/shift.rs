//! # Shift Reconciliation Service
//!
//! One OPEN cash-register session per cashier.
//!
//! ```text
//! open(cashier, start_cash)
//!   ├── cashier already has an OPEN shift ──► ShiftAlreadyOpen
//!   └── INSERT … status = 'OPEN'
//!         partial unique index on (cashier_id) WHERE status = 'OPEN'
//!         catches the concurrent double-open
//!
//! close(shift_id, actual_cash, notes)
//!   ├── unknown ──► ShiftNotFound,  CLOSED ──► ShiftNotOpen
//!   └── UPDATE … WHERE status = 'OPEN' AND expected_cash = <read value>
//!         a cash sale committed in between ──► Conflict ──► retried
//! ```

use chrono::Utc;
use tracing::info;

use tally_core::{
    ClosedShift, CoreError, LedgerConfig, Money, Session, Shift, ShiftSummary,
};

use crate::error::{LedgerError, ServiceResult};
use crate::pool::Database;
use crate::service::should_retry;

#[derive(Debug, Clone)]
pub struct ShiftService {
    db: Database,
    config: LedgerConfig,
}

impl ShiftService {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        ShiftService { db, config }
    }

    /// Opens a shift for `cashier_id` with a counted opening float.
    pub async fn open(&self, cashier_id: &str, start_cash: Money) -> ServiceResult<Shift> {
        let shift = Shift::open(cashier_id, start_cash, Utc::now())?;

        let shifts = self.db.shifts();
        if let Some(open) = shifts.find_open_for_cashier(cashier_id).await? {
            return Err(already_open(cashier_id, open.id));
        }

        if let Err(err) = shifts.insert(&shift).await {
            if err.is_unique_violation_on("shifts.cashier_id") {
                let shift_id = shifts
                    .find_open_for_cashier(cashier_id)
                    .await?
                    .map(|s| s.id)
                    .unwrap_or_default();
                return Err(already_open(cashier_id, shift_id));
            }
            return Err(err.into());
        }

        info!(shift_id = %shift.id, cashier_id = %cashier_id, start_cash = %start_cash, "Shift opened");
        Ok(shift)
    }

    /// Closes an OPEN shift with the counted drawer cash.
    ///
    /// Only the shift row changes. The summary covers every sale recorded
    /// against the shift.
    pub async fn close(
        &self,
        shift_id: &str,
        actual_cash: Money,
        notes: Option<String>,
    ) -> ServiceResult<ClosedShift> {
        let mut attempt = 0;
        loop {
            match self.try_close(shift_id, actual_cash, notes.clone()).await {
                Err(err) if should_retry(&err, attempt, &self.config, "close_shift") => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_close(
        &self,
        shift_id: &str,
        actual_cash: Money,
        notes: Option<String>,
    ) -> ServiceResult<ClosedShift> {
        let shifts = self.db.shifts();
        let mut shift = shifts
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotFound(shift_id.to_string()))?;

        shift.close(actual_cash, notes, Utc::now())?;
        shifts.close(&shift).await?;

        let transactions = self.db.transactions().list_for_shift(shift_id).await?;
        let summary = ShiftSummary::from_transactions(&transactions);

        info!(
            shift_id = %shift.id,
            expected_cash = %shift.expected_cash,
            actual_cash = %actual_cash,
            difference = %shift.difference.unwrap_or_default(),
            transactions = summary.transaction_count,
            total_sales = %summary.total_sales(),
            "Shift closed"
        );

        Ok(ClosedShift { shift, summary })
    }

    /// The cashier's OPEN shift, if any.
    pub async fn current_shift(&self, cashier_id: &str) -> ServiceResult<Option<Shift>> {
        Ok(self.db.shifts().find_open_for_cashier(cashier_id).await?)
    }

    pub async fn get(&self, shift_id: &str) -> ServiceResult<Shift> {
        self.db
            .shifts()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotFound(shift_id.to_string()).into())
    }

    /// Sale context for the cashier's OPEN shift.
    ///
    /// ## Errors
    /// `ShiftNotFound` when the cashier has no OPEN shift.
    pub async fn session_for(&self, cashier_id: &str) -> ServiceResult<Session> {
        self.current_shift(cashier_id)
            .await?
            .map(|shift| Session::for_shift(&shift))
            .ok_or_else(|| CoreError::ShiftNotFound(format!("open shift of {cashier_id}")).into())
    }

    /// Shifts of a cashier, newest first.
    pub async fn history(&self, cashier_id: &str) -> ServiceResult<Vec<Shift>> {
        Ok(self.db.shifts().list_for_cashier(cashier_id).await?)
    }
}

fn already_open(cashier_id: &str, shift_id: String) -> LedgerError {
    CoreError::ShiftAlreadyOpen {
        cashier_id: cashier_id.to_string(),
        shift_id,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
