//! # Service Module
//!
//! Runs tally-core decisions against the store, atomically.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tally (facade: Database + LedgerConfig)                               │
//! │    │                                                                    │
//! │    ├── catalog()  CatalogService   products, inventory metadata        │
//! │    ├── recipes()  RecipeService    bills of materials                  │
//! │    ├── ledger()   LedgerService    deduction, restock, low stock       │
//! │    ├── sales()    SaleService      commit_sale, lookup, search         │
//! │    ├── shifts()   ShiftService     open, close, current shift          │
//! │    └── reports()  ReportService    summaries, expenses                 │
//! │                                                                         │
//! │  Each write:  BEGIN → read → tally-core plan → versioned write → COMMIT │
//! │  Lost race (DbError::Conflict) → retried up to max_conflict_retries     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod ledger;
pub mod recipe;
pub mod report;
pub mod sale;
pub mod shift;

use tally_core::LedgerConfig;
use tracing::warn;

use crate::error::{LedgerError, ServiceResult};
use crate::pool::{Database, DbConfig};

pub use catalog::{CatalogService, InventoryItemUpdate, NewInventoryItem, NewProduct, ProductUpdate};
pub use ledger::{LedgerService, RestockOutcome};
pub use recipe::RecipeService;
pub use report::ReportService;
pub use sale::{CommittedSale, SaleService, TransactionFilter};
pub use shift::ShiftService;

/// Entry point bundling the store with the ledger configuration.
///
/// ## Usage
/// ```rust,ignore
/// let tally = Tally::connect(DbConfig::new("./tally.db"), LedgerConfig::from_env()?).await?;
/// let shift = tally.shifts().open("u2", Money::from_minor(100_000)).await?;
/// let sale = tally
///     .sales()
///     .commit_sale(&Session::for_shift(&shift), &cart, PaymentMethod::Cash, tendered)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Tally {
    db: Database,
    config: LedgerConfig,
}

impl Tally {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        Tally { db, config }
    }

    /// Opens (and migrates) the database, then wraps it.
    pub async fn connect(db_config: DbConfig, config: LedgerConfig) -> ServiceResult<Self> {
        let db = Database::new(db_config).await?;
        Ok(Tally::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone())
    }

    pub fn recipes(&self) -> RecipeService {
        RecipeService::new(self.db.clone())
    }

    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.db.clone(), self.config.clone())
    }

    pub fn sales(&self) -> SaleService {
        SaleService::new(self.db.clone(), self.config.clone())
    }

    pub fn shifts(&self) -> ShiftService {
        ShiftService::new(self.db.clone(), self.config.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.db.clone(), self.config.clone())
    }
}

/// Whether a failed attempt should be run again.
pub(crate) fn should_retry(
    err: &LedgerError,
    attempt: u32,
    config: &LedgerConfig,
    operation: &'static str,
) -> bool {
    if !err.is_retryable() || attempt >= config.max_conflict_retries {
        return false;
    }
    warn!(
        operation,
        attempt = attempt + 1,
        max_retries = config.max_conflict_retries,
        error = %err,
        "Concurrent update, retrying with fresh state"
    );
    true
}
