//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations, unknown ids          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Caller-facing category (retry or not?)         │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  ├── DbError          - Store failures, conflicts                      │
//! │  └── LedgerError      - CoreError | DbError, returned by services      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, required vs available)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// How a caller should react to a failed operation.
///
/// ```text
/// Validation    → fix the input; never retried automatically
/// BusinessRule  → operator corrects (top up cash, restock) and retries
/// Conflict      → safe to retry transparently with fresh state
/// NotFound      → fatal to the operation, surfaced as-is
/// Unavailable   → store/transport failure, caller decides messaging
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    BusinessRule,
    Conflict,
    NotFound,
    Unavailable,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale was submitted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Aggregated recipe consumption exceeds the stock of an ingredient.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: 2 × Kopi Susu (15 gr coffee each)
    ///      │
    ///      ▼
    /// Aggregate: coffee needs 30 gr, available 20 gr
    ///      │
    ///      ▼
    /// InsufficientStock { inventory_item_id: "i1", required: 30, available: 20 }
    ///      │
    ///      ▼
    /// Nothing written; UI shows "restock coffee"
    /// ```
    #[error(
        "Insufficient stock for {inventory_item_id}: required {required}, available {available}"
    )]
    InsufficientStock {
        inventory_item_id: String,
        required: i64,
        available: i64,
    },

    /// Cash tendered does not cover the grand total.
    #[error("Insufficient payment: total {required}, tendered {tendered}")]
    InsufficientPayment { required: Money, tendered: Money },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Inventory item not found: {0}")]
    InventoryItemNotFound(String),

    /// Product is referenced by a committed transaction line.
    #[error("Product {0} is referenced by recorded sales and cannot be changed")]
    ProductInUse(String),

    /// Inventory item is still an ingredient of some recipe.
    #[error("Inventory item {item_id} is used by the recipe of product {product_id}")]
    InventoryItemInUse { item_id: String, product_id: String },

    #[error("Recipe not found for product {0}")]
    RecipeNotFound(String),

    /// A recipe already exists for the product (create path only).
    #[error("Recipe already exists for product {0}")]
    DuplicateRecipe(String),

    /// An ingredient row is unusable (non-positive quantity, repeated item, ...).
    #[error("Invalid ingredient {inventory_item_id}: {reason}")]
    InvalidIngredient {
        inventory_item_id: String,
        reason: String,
    },

    /// Non-positive quantity on a stock movement.
    #[error("Invalid quantity {qty}: must be greater than zero")]
    InvalidQuantity { qty: i64 },

    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// The shift is CLOSED (or does not belong to the calling cashier).
    #[error("Shift {0} is not open")]
    ShiftNotOpen(String),

    /// The cashier already has an OPEN shift.
    #[error("Cashier {cashier_id} already has an open shift ({shift_id})")]
    ShiftAlreadyOpen {
        cashier_id: String,
        shift_id: String,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the caller-facing category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::EmptyCart
            | CoreError::DuplicateRecipe(_)
            | CoreError::InvalidIngredient { .. }
            | CoreError::InvalidQuantity { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,

            CoreError::InsufficientStock { .. }
            | CoreError::InsufficientPayment { .. }
            | CoreError::ProductInUse(_)
            | CoreError::InventoryItemInUse { .. }
            | CoreError::ShiftNotOpen(_)
            | CoreError::ShiftAlreadyOpen { .. } => ErrorKind::BusinessRule,

            CoreError::ProductNotFound(_)
            | CoreError::InventoryItemNotFound(_)
            | CoreError::RecipeNotFound(_)
            | CoreError::ShiftNotFound(_)
            | CoreError::TransactionNotFound(_) => ErrorKind::NotFound,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparsable date, unknown enum tag).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Start of a range is after its end.
    #[error("{field}: start {start} is after end {end}")]
    InvertedRange {
        field: String,
        start: String,
        end: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
