//! # Shift State Machine
//!
//! ```text
//!            open(cashier, start_cash)
//!                     │
//!                     ▼
//!   ┌──────────────────────────────────┐   cash sale (store-side add,
//!   │ OPEN   expected = start + Σ cash │◄──────────────┐  guarded on OPEN)
//!   └──────────────────────────────────┘───────────────┘
//!                     │ close(actual, notes)
//!                     ▼
//!   ┌──────────────────────────────────┐
//!   │ CLOSED difference = actual − exp │  terminal
//!   └──────────────────────────────────┘
//! ```
//!
//! One OPEN shift per cashier is enforced by the store, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Shift, ShiftStatus, Transaction};
use crate::validation::{validate_id, validate_non_negative_amount};

impl Shift {
    /// Starts a new OPEN shift with a counted opening float.
    pub fn open(cashier_id: &str, start_cash: Money, now: DateTime<Utc>) -> CoreResult<Shift> {
        validate_id("cashier id", cashier_id)?;
        validate_non_negative_amount("start cash", start_cash)?;

        Ok(Shift {
            id: Uuid::new_v4().to_string(),
            cashier_id: cashier_id.to_string(),
            start_time: now,
            start_cash,
            expected_cash: start_cash,
            status: ShiftStatus::Open,
            end_time: None,
            actual_cash: None,
            difference: None,
            notes: None,
        })
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }

    /// Fails with `ShiftNotOpen` unless OPEN.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::ShiftNotOpen(self.id.clone()))
        }
    }

    /// Closes the shift with the counted drawer cash.
    ///
    /// `difference` is positive for surplus, negative for shortage.
    pub fn close(
        &mut self,
        actual_cash: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.ensure_open()?;
        validate_non_negative_amount("actual cash", actual_cash)?;

        self.status = ShiftStatus::Closed;
        self.end_time = Some(now);
        self.actual_cash = Some(actual_cash);
        self.difference = Some(actual_cash - self.expected_cash);
        self.notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(())
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Sales recorded during a shift, split by drawer impact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftSummary {
    pub transaction_count: i64,
    pub cash_sales: Money,
    pub non_cash_sales: Money,
}

impl ShiftSummary {
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut summary = ShiftSummary::default();
        for tx in transactions {
            summary.transaction_count += 1;
            match tx.payment_method {
                PaymentMethod::Cash => summary.cash_sales += tx.amount_paid,
                PaymentMethod::Qris | PaymentMethod::Card => {
                    summary.non_cash_sales += tx.grand_total
                }
            }
        }
        summary
    }

    pub fn total_sales(&self) -> Money {
        self.cash_sales + self.non_cash_sales
    }
}

/// A closed shift with the sales it covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosedShift {
    pub shift: Shift,
    pub summary: ShiftSummary,
}

// =============================================================================
// Unit Tests
// =============================================================================
