//! # Repository Module
//!
//! The persistence interface of Tally POS: the only code that speaks SQL.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Service (sale, ledger, shift, ...)                                    │
//! │       │                                                                 │
//! │       │  &self methods      → run on the pool (single statement)       │
//! │       │  fn(conn, ...)      → run inside the caller's store            │
//! │       │                       transaction (&mut SqliteConnection)      │
//! │       ▼                                                                 │
//! │  XxxRepository                                                         │
//! │  ├── get_by_id / fetch                                                 │
//! │  ├── list / list_between                                               │
//! │  ├── insert                                                            │
//! │  └── update / compare_and_set / delete                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD
//! - [`InventoryRepository`](inventory::InventoryRepository) - Items, versioned stock writes
//! - [`RecipeRepository`](recipe::RecipeRepository) - Bills of materials
//! - [`TransactionRepository`](transaction::TransactionRepository) - Sales and lines
//! - [`ShiftRepository`](shift::ShiftRepository) - Cash shifts
//! - [`RestockRepository`](restock::RestockRepository) - Restock audit trail
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Operating expenses

pub mod expense;
pub mod inventory;
pub mod product;
pub mod recipe;
pub mod restock;
pub mod shift;
pub mod transaction;
