//! # Transaction Repository
//!
//! Database operations for sale transactions and their lines.
//!
//! ## Transaction Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  One store transaction (sale service)                   │
//! │                                                                         │
//! │  1. insert_pending()  → Transaction { status: PENDING } + lines         │
//! │  2. (inventory deduction, may roll everything back)                     │
//! │  3. mark_paid()       → Transaction { status: PAID }                    │
//! │  4. (shift expected cash)                                               │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Readers outside the store transaction only ever see PAID rows.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are append-only: there is no update of amounts or lines and no
//! delete. Ordering is `created_at`, ties broken by insertion order (rowid).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tally_core::{
    Money, PaymentMethod, ProductSnapshot, Transaction, TransactionLine, TransactionStatus,
};

/// Default page size of [`TransactionRepository::search`].
pub const DEFAULT_SEARCH_LIMIT: u32 = 200;

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    shift_id: String,
    cashier_id: String,
    grand_total: Money,
    payment_method: PaymentMethod,
    amount_paid: Money,
    change_due: Money,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_transaction(self, lines: Vec<TransactionLine>) -> Transaction {
        Transaction {
            id: self.id,
            shift_id: self.shift_id,
            cashier_id: self.cashier_id,
            lines,
            grand_total: self.grand_total,
            payment_method: self.payment_method,
            amount_paid: self.amount_paid,
            change: self.change_due,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    transaction_id: String,
    product_id: String,
    product_name: String,
    product_price: Money,
    product_category: String,
    qty: i64,
}

impl From<LineRow> for TransactionLine {
    fn from(row: LineRow) -> Self {
        TransactionLine {
            product_id: row.product_id,
            product: ProductSnapshot {
                name: row.product_name,
                price: row.product_price,
                category: row.product_category,
            },
            qty: row.qty,
        }
    }
}

/// Filters for [`TransactionRepository::search`]. All optional, ANDed.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    /// Substring of the transaction id (receipt lookup).
    pub id_contains: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub until: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub limit: Option<u32>,
}

/// Repository for transaction database operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Inserts a transaction as PENDING, with its lines.
    ///
    /// ## Snapshot Pattern
    /// Product name, price and category are copied to each line so the
    /// record survives later catalog edits unchanged.
    pub async fn insert_pending(conn: &mut SqliteConnection, tx: &Transaction) -> DbResult<()> {
        debug!(id = %tx.id, shift_id = %tx.shift_id, lines = tx.lines.len(), "Inserting pending transaction");

        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, shift_id, cashier_id, grand_total, payment_method,
                amount_paid, change_due, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.shift_id)
        .bind(&tx.cashier_id)
        .bind(tx.grand_total)
        .bind(tx.payment_method)
        .bind(tx.amount_paid)
        .bind(tx.change)
        .bind(TransactionStatus::Pending)
        .bind(tx.created_at)
        .execute(&mut *conn)
        .await?;

        for (position, line) in tx.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO transaction_lines (
                    transaction_id, position, product_id,
                    product_name, product_price, product_category, qty
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&tx.id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(&line.product.name)
            .bind(line.product.price)
            .bind(&line.product.category)
            .bind(line.qty)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Moves a PENDING transaction to PAID.
    pub async fn mark_paid(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE transactions SET status = ?2 WHERE id = ?1 AND status = ?3",
        )
        .bind(id)
        .bind(TransactionStatus::Paid)
        .bind(TransactionStatus::Pending)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction (pending)", id));
        }

        Ok(())
    }

    /// Gets a PAID transaction by ID, with lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, shift_id, cashier_id, grand_total, payment_method,
                   amount_paid, change_due, status, created_at
            FROM transactions
            WHERE id = ?1 AND status = 'PAID'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.lines_of(&row.id).await?;
                Ok(Some(row.into_transaction(lines)))
            }
            None => Ok(None),
        }
    }

    /// Searches PAID transactions, newest first.
    pub async fn search(&self, query: &TransactionQuery) -> DbResult<Vec<Transaction>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT id, shift_id, cashier_id, grand_total, payment_method,
                   amount_paid, change_due, status, created_at
            FROM transactions
            WHERE status = 'PAID'
            "#,
        );

        if let Some(fragment) = query.id_contains.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder.push(" AND instr(id, ").push_bind(fragment.to_string()).push(") > 0");
        }
        if let Some(from) = query.from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(until) = query.until {
            builder.push(" AND created_at < ").push_bind(until);
        }
        if let Some(method) = query.payment_method {
            builder.push(" AND payment_method = ").push_bind(method);
        }
        builder
            .push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)));

        let rows: Vec<TransactionRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        debug!(count = rows.len(), "Transaction search returned rows");

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.lines_of(&row.id).await?;
            transactions.push(row.into_transaction(lines));
        }
        Ok(transactions)
    }

    /// PAID transactions with `from <= created_at < until`, oldest first.
    pub async fn list_paid_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, shift_id, cashier_id, grand_total, payment_method,
                   amount_paid, change_due, status, created_at
            FROM transactions
            WHERE status = 'PAID' AND created_at >= ?1 AND created_at < ?2
            ORDER BY created_at, rowid
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        let line_rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT l.transaction_id, l.product_id, l.product_name,
                   l.product_price, l.product_category, l.qty
            FROM transaction_lines l
            JOIN transactions t ON t.id = l.transaction_id
            WHERE t.status = 'PAID' AND t.created_at >= ?1 AND t.created_at < ?2
            ORDER BY l.transaction_id, l.position
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<String, Vec<TransactionLine>> = HashMap::new();
        for row in line_rows {
            lines
                .entry(row.transaction_id.clone())
                .or_default()
                .push(row.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tx_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_transaction(tx_lines)
            })
            .collect())
    }

    /// PAID transactions of one shift, oldest first.
    pub async fn list_for_shift(&self, shift_id: &str) -> DbResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, shift_id, cashier_id, grand_total, payment_method,
                   amount_paid, change_due, status, created_at
            FROM transactions
            WHERE shift_id = ?1 AND status = 'PAID'
            ORDER BY created_at, rowid
            "#,
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = self.lines_of(&row.id).await?;
            transactions.push(row.into_transaction(lines));
        }
        Ok(transactions)
    }

    /// Counts transactions in any status (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn lines_of(&self, transaction_id: &str) -> DbResult<Vec<TransactionLine>> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT transaction_id, product_id, product_name,
                   product_price, product_category, qty
            FROM transaction_lines
            WHERE transaction_id = ?1
            ORDER BY position
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(TransactionLine::from).collect())
    }
}
