//! # Domain Types
//!
//! Records shared by every component of the ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Recipe      │   │  InventoryItem  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  product_id     │   │  id             │       │
//! │  │  name, price    │   │  ingredients ───┼──►│  stock          │       │
//! │  │  category       │   │  (qty per unit) │   │  unit_cost      │       │
//! │  └─────────────────┘   └─────────────────┘   │  version        │       │
//! │          ▲                                    └────────▲────────┘       │
//! │          │ snapshot                                    │               │
//! │  ┌───────┴─────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │  Transaction    │──►│     Shift       │   │  RestockEvent   │       │
//! │  │  lines[]        │   │  expected_cash  │   │  qty, total     │       │
//! │  │  grand_total    │   │  OPEN → CLOSED  │   │  cost before/   │       │
//! │  │  PENDING → PAID │   └─────────────────┘   │  after          │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quantities
//! Stock and recipe quantities are signed integers in the item's base unit
//! (grams, millilitres, pieces). Stock may go below zero only under the
//! permissive stock policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::overflow;

// =============================================================================
// Stock Unit
// =============================================================================

/// Base unit an inventory item is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum StockUnit {
    /// Weight, grams.
    #[serde(rename = "gr")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "gr"))]
    Gram,
    /// Volume, millilitres.
    #[serde(rename = "ml")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ml"))]
    Milliliter,
    /// Count, pieces.
    #[serde(rename = "pcs")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "pcs"))]
    Piece,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Selling price.
    pub price: Money,

    /// Free-form category label ("Coffee", "Food", ...).
    pub category: String,

    /// Opaque image reference (emoji, URL, asset key).
    pub image: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Freezes the sale-relevant fields of this product.
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            price: self.price,
            category: self.category.clone(),
        }
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A stocked ingredient or consumable.
///
/// `stock` and `unit_cost` are written only by the inventory ledger.
/// `version` increments on every write and guards compare-and-swap updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub unit: StockUnit,
    /// Current quantity on hand, in `unit`.
    pub stock: i64,
    /// Weighted-average cost of one `unit`.
    pub unit_cost: Money,
    /// Reorder threshold.
    pub min_stock: i64,
    /// Optimistic-concurrency revision counter.
    pub version: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Recipe
// =============================================================================

/// One row of a bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecipeIngredient {
    pub inventory_item_id: String,
    /// Quantity consumed per unit of product sold.
    pub qty_per_unit: i64,
}

impl RecipeIngredient {
    pub fn new(inventory_item_id: impl Into<String>, qty_per_unit: i64) -> Self {
        RecipeIngredient {
            inventory_item_id: inventory_item_id.into(),
            qty_per_unit,
        }
    }
}

/// Bill of materials of a product. At most one per product.
///
/// Build through [`Recipe::new`](crate::recipe) so ingredient rules are
/// enforced at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Recipe {
    pub product_id: String,
    /// Ordered as entered.
    pub ingredients: Vec<RecipeIngredient>,
}

// =============================================================================
// Cart & Transaction
// =============================================================================

/// What the cart assembler hands to the transaction processor.
/// Never carries a price: the processor re-reads the current product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub qty: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, qty: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            qty,
        }
    }
}

/// Product fields frozen at sale time so later edits don't rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Money,
    pub category: String,
}

/// A committed sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionLine {
    pub product_id: String,
    pub product: ProductSnapshot,
    pub qty: i64,
}

impl TransactionLine {
    /// Snapshot price × quantity.
    #[inline]
    pub fn line_total(&self) -> CoreResult<Money> {
        self.product
            .price
            .checked_mul_quantity(self.qty)
            .ok_or_else(|| CoreError::from(overflow("line total")))
    }
}

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum PaymentMethod {
    /// Physical cash; counts toward the shift's expected drawer cash.
    Cash,
    /// QR code payment.
    Qris,
    /// Card on an external terminal.
    Card,
}

impl PaymentMethod {
    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

/// Persistence state of a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum TransactionStatus {
    /// Written, stock deduction not yet applied. Never visible after commit.
    Pending,
    /// Terminal.
    Paid,
}

/// An immutable, append-only sale record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub shift_id: String,
    pub cashier_id: String,
    pub lines: Vec<TransactionLine>,
    pub grand_total: Money,
    pub payment_method: PaymentMethod,
    pub amount_paid: Money,
    pub change: Money,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.qty).sum()
    }
}

// =============================================================================
// Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// A cash-register session from open to close.
///
/// Lifecycle and arithmetic live in [`crate::shift`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub cashier_id: String,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    pub start_cash: Money,
    /// start_cash + Σ cash sales of this shift.
    pub expected_cash: Money,
    pub status: ShiftStatus,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    pub actual_cash: Option<Money>,
    /// actual_cash − expected_cash, set at close.
    pub difference: Option<Money>,
    pub notes: Option<String>,
}

/// Explicit caller context for sale operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Session {
    pub cashier_id: String,
    pub shift_id: String,
}

impl Session {
    pub fn new(cashier_id: impl Into<String>, shift_id: impl Into<String>) -> Self {
        Session {
            cashier_id: cashier_id.into(),
            shift_id: shift_id.into(),
        }
    }

    /// Session bound to an (open) shift and its cashier.
    pub fn for_shift(shift: &Shift) -> Self {
        Session::new(shift.cashier_id.clone(), shift.id.clone())
    }
}

// =============================================================================
// Restock & Expense
// =============================================================================

/// Audit record of one restock revaluation. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RestockEvent {
    pub id: String,
    pub inventory_item_id: String,
    pub qty: i64,
    /// Purchase cost of the whole batch.
    pub total_cost: Money,
    pub unit_cost_before: Money,
    pub unit_cost_after: Money,
    pub stock_after: i64,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

/// An operating expense that is not a restock (rent, utilities, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub total_cost: Money,
    #[ts(as = "String")]
    pub incurred_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_uses_snapshot_price() {
        let line = TransactionLine {
            product_id: "p1".to_string(),
            product: ProductSnapshot {
                name: "Kopi Susu Gula Aren".to_string(),
                price: Money::from_minor(18_000),
                category: "Coffee".to_string(),
            },
            qty: 2,
        };
        assert_eq!(line.line_total().unwrap(), Money::from_minor(36_000));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Cash).unwrap(),
            "\"CASH\""
        );
        assert_eq!(serde_json::to_string(&StockUnit::Gram).unwrap(), "\"gr\"");
        assert_eq!(
            serde_json::to_string(&ShiftStatus::Closed).unwrap(),
            "\"CLOSED\""
        );
    }
}
