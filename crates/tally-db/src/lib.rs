//! # tally-db: Store Layer and Ledger Services for Tally POS
//!
//! SQLite persistence (sqlx) plus the services that apply tally-core
//! decisions to the shared store atomically.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  Cart UI / receipt printer (external)                                  │
//! │       │  [{product_id, qty}]           ▲ committed Transaction          │
//! │       ▼                                │                               │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Services    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service/)    │───►│ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SaleService   │    │ ProductRepo   │    │ 001_initial_ │  │   │
//! │  │   │ LedgerService │    │ InventoryRepo │    │ schema.sql   │  │   │
//! │  │   │ ShiftService  │    │ ShiftRepo ... │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │ tally-core plans   │ SQL                           │   │
//! │  └───────────┼────────────────────┼───────────────────────────────┘   │
//! │              ▼                    ▼                                     │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            SQLite Database (WAL, versioned stock rows)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store and service error types
//! - [`repository`] - One repository per table family
//! - [`service`] - Catalog, recipes, ledger, sales, shifts, reports
//! - [`seed`] - Starter coffee-shop catalog
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::{CartLine, LedgerConfig, Money, PaymentMethod, Session};
//! use tally_db::{DbConfig, Tally};
//!
//! let tally = Tally::connect(DbConfig::new("./tally.db"), LedgerConfig::from_env()?).await?;
//!
//! let shift = tally.shifts().open("u2", Money::from_minor(100_000)).await?;
//! let sale = tally
//!     .sales()
//!     .commit_sale(
//!         &Session::for_shift(&shift),
//!         &[CartLine::new("p1", 2)],
//!         PaymentMethod::Cash,
//!         Money::from_minor(50_000),
//!     )
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, LedgerError, ServiceResult};
pub use pool::{Database, DbConfig};
pub use seed::seed_coffee_shop;
pub use service::{
    CatalogService, CommittedSale, InventoryItemUpdate, LedgerService, NewInventoryItem,
    NewProduct, ProductUpdate, RecipeService, ReportService, RestockOutcome, SaleService,
    ShiftService, Tally, TransactionFilter,
};

// Repository re-exports for convenience
pub use repository::inventory::InventoryRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::{TransactionQuery, TransactionRepository};
