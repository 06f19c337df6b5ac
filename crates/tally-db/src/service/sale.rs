//! # Transaction Processor
//!
//! Validates and commits a sale.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  normalize cart (EmptyCart, qty range, merge duplicates)   no I/O       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├─ read current products → price_cart (snapshots)                    │
//! │   ├─ settle_payment           InsufficientPayment                      │
//! │   ├─ read shift               ShiftNotFound / ShiftNotOpen             │
//! │   ├─ INSERT transaction       status = PENDING                         │
//! │   ├─ ledger::deduct_in        InsufficientStock → ROLLBACK             │
//! │   ├─ UPDATE → PAID                                                     │
//! │   ├─ CASH: expected_cash += amount_paid   WHERE status = 'OPEN'        │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Conflict anywhere → ROLLBACK → retried from BEGIN                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A draft cart lives only in the caller until `commit_sale`; discarding it
//! touches nothing.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use tally_core::report::ReportRange;
use tally_core::sale::{normalize_cart, price_cart, settle_payment};
use tally_core::{
    CartLine, CoreError, LedgerConfig, LowStockWarning, Money, PaymentMethod, Session,
    Transaction, TransactionStatus,
};

use crate::error::ServiceResult;
use crate::pool::Database;
use crate::repository::product::ProductRepository;
use crate::repository::shift::ShiftRepository;
use crate::repository::transaction::{TransactionQuery, TransactionRepository};
use crate::service::ledger::deduct_in;
use crate::service::should_retry;

/// A committed sale and the stock warnings it raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedSale {
    pub transaction: Transaction,
    pub warnings: Vec<LowStockWarning>,
}

/// Transaction search filters. Dates are local calendar days, inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub id_contains: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
    config: LedgerConfig,
}

impl SaleService {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        SaleService { db, config }
    }

    /// Commits a sale: transaction record, stock deduction and shift cash
    /// become visible together or not at all.
    ///
    /// ## Errors
    /// - `EmptyCart`, `Validation` for unusable lines
    /// - `ProductNotFound`
    /// - `InsufficientPayment` (cash only)
    /// - `ShiftNotFound`, `ShiftNotOpen` (also for another cashier's shift)
    /// - `InsufficientStock` under the STRICT policy
    pub async fn commit_sale(
        &self,
        session: &Session,
        lines: &[CartLine],
        payment_method: PaymentMethod,
        amount_paid: Money,
    ) -> ServiceResult<CommittedSale> {
        let lines = normalize_cart(lines)?;

        let mut attempt = 0;
        loop {
            match self
                .try_commit(session, &lines, payment_method, amount_paid)
                .await
            {
                Err(err) if should_retry(&err, attempt, &self.config, "commit_sale") => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_commit(
        &self,
        session: &Session,
        lines: &[CartLine],
        payment_method: PaymentMethod,
        amount_paid: Money,
    ) -> ServiceResult<CommittedSale> {
        let mut tx = self.db.pool().begin().await?;

        let mut products = HashMap::with_capacity(lines.len());
        for line in lines {
            if let Some(product) = ProductRepository::fetch(&mut tx, &line.product_id).await? {
                products.insert(product.id.clone(), product);
            }
        }
        let priced = price_cart(lines, &products)?;
        let tender = settle_payment(payment_method, amount_paid, priced.grand_total)?;

        let shift = ShiftRepository::fetch(&mut tx, &session.shift_id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotFound(session.shift_id.clone()))?;
        shift.ensure_open()?;
        if shift.cashier_id != session.cashier_id {
            return Err(CoreError::ShiftNotOpen(shift.id).into());
        }

        let mut transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id.clone(),
            cashier_id: session.cashier_id.clone(),
            lines: priced.lines,
            grand_total: priced.grand_total,
            payment_method,
            amount_paid: tender.amount_paid,
            change: tender.change,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };
        TransactionRepository::insert_pending(&mut tx, &transaction).await?;

        let ledger = match deduct_in(&mut tx, lines, self.config.stock_policy).await {
            Ok(result) => result,
            Err(err) => {
                tx.rollback().await?;
                return Err(err);
            }
        };

        TransactionRepository::mark_paid(&mut tx, &transaction.id).await?;
        transaction.status = TransactionStatus::Paid;

        if payment_method.is_cash()
            && !ShiftRepository::add_expected_cash(&mut tx, &shift.id, tender.amount_paid).await?
        {
            return Err(CoreError::ShiftNotOpen(shift.id).into());
        }

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            shift_id = %transaction.shift_id,
            grand_total = %transaction.grand_total,
            payment_method = ?payment_method,
            items = transaction.item_count(),
            warnings = ledger.warnings.len(),
            "Sale committed"
        );

        Ok(CommittedSale {
            transaction,
            warnings: ledger.warnings,
        })
    }

    /// A committed transaction by id.
    pub async fn get_transaction(&self, id: &str) -> ServiceResult<Transaction> {
        self.db
            .transactions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(id.to_string()).into())
    }

    /// Committed transactions matching `filter`, newest first.
    pub async fn search_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> ServiceResult<Vec<Transaction>> {
        let offset = self.config.utc_offset();

        let mut query = TransactionQuery {
            id_contains: filter.id_contains.clone(),
            payment_method: filter.payment_method,
            limit: filter.limit,
            ..TransactionQuery::default()
        };

        match (filter.start_date, filter.end_date) {
            (Some(start), Some(end)) => {
                let range = ReportRange::new(start, end, offset)?;
                query.from = Some(range.start());
                query.until = Some(range.end_exclusive());
            }
            (Some(start), None) => {
                query.from = Some(ReportRange::new(start, start, offset)?.start());
            }
            (None, Some(end)) => {
                query.until = Some(ReportRange::new(end, end, offset)?.end_exclusive());
            }
            (None, None) => {}
        }

        Ok(self.db.transactions().search(&query).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
