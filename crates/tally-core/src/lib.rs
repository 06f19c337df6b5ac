//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate decides what every sale, restock and shift close does to stock,
//! cost and cash. It has zero I/O dependencies; `tally-db` loads records,
//! calls into this crate, and commits the outcome atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           Cart assembler / admin UI / receipt printer           │   │
//! │  │                        (external)                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ [{product_id, qty}], Session          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               tally-db services (atomic commits)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │ recipe  │ │ costing │ │ ledger  │ │  sale   │ │  shift  │  │   │
//! │  │   │  rules  │ │ avg cost│ │  plans  │ │ pricing │ │  state  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐              │   │
//! │  │   │ report  │ │  money  │ │validation│ │ config  │              │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘              │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, InventoryItem, Recipe, Transaction, Shift)
//! - [`money`] - Integer money with round-half-up division
//! - [`error`] - Domain error types and [`ErrorKind`]
//! - [`validation`] - Field-level input checks
//! - [`recipe`] - Bill-of-materials rules
//! - [`costing`] - Weighted-average unit cost and COGS
//! - [`ledger`] - Stock deduction and restock planning
//! - [`sale`] - Cart normalization, pricing and tender
//! - [`shift`] - Shift lifecycle and summaries
//! - [`report`] - Sales/profit aggregation over local days
//! - [`config`] - Ledger configuration
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output; the clock is a parameter
//! 2. **No I/O**: database, network and file access live in `tally-db`
//! 3. **Integer Money**: minor units (i64), one explicit rounding rule
//! 4. **Explicit Errors**: typed errors, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::costing::revalue_on_restock;
//! use tally_core::Money;
//!
//! // 1000 gr @ 300, then 500 gr bought for 150 000
//! let cost = revalue_on_restock(1000, Money::from_minor(300), 500, Money::from_minor(150_000));
//! assert_eq!(cost.minor(), 300);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod costing;
pub mod error;
pub mod ledger;
pub mod money;
pub mod recipe;
pub mod report;
pub mod sale;
pub mod shift;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use config::{ConfigError, LedgerConfig};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use ledger::{LedgerResult, LowStockWarning, StockChange, StockPolicy};
pub use money::Money;
pub use report::{Report, ReportPeriod, ReportRange};
pub use shift::{ClosedShift, ShiftSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single product in one sale.
///
/// ## Business Reason
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum amount of one ingredient consumed per unit sold.
pub const MAX_QTY_PER_UNIT: i64 = 1_000_000;

/// Maximum stock level, opening stock or restock quantity of one item.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000_000;

/// Maximum single amount (price, unit cost, purchase cost, cash) in minor units.
///
/// Keeps `price × qty` and `unit_cost × qty_per_unit` inside i64.
pub const MAX_AMOUNT_MINOR: i64 = 1_000_000_000_000;
