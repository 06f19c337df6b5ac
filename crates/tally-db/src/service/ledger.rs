//! # Inventory Ledger Service
//!
//! The only writer of `inventory_items.stock` and `unit_cost`.
//!
//! ## Deduction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   ├─ read recipes of the cart's products                               │
//! │   ├─ read every consumed item (id order)        version = v            │
//! │   ├─ plan_deduction (tally-core)                STRICT / PERMISSIVE    │
//! │   │     InsufficientStock → ROLLBACK, nothing written                  │
//! │   └─ compare_and_set per item                   WHERE version = v      │
//! │         0 rows / SQLITE_BUSY → Conflict → ROLLBACK → retry from BEGIN  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The sale service calls [`deduct_in`] inside its own store transaction so
//! the transaction record, stock and shift cash commit together.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{info, warn};

use tally_core::costing::ItemIndex;
use tally_core::ledger::{aggregate_consumption, plan_deduction, plan_restock};
use tally_core::sale::normalize_cart;
use tally_core::{
    CartLine, CoreError, InventoryItem, LedgerConfig, LedgerResult, Money, RestockEvent,
    StockPolicy,
};

use crate::error::ServiceResult;
use crate::pool::Database;
use crate::repository::inventory::InventoryRepository;
use crate::repository::recipe::RecipeRepository;
use crate::repository::restock::{generate_restock_id, RestockRepository};
use crate::service::should_retry;

/// Item state after a restock plus the audit record written with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RestockOutcome {
    pub item: InventoryItem,
    pub event: RestockEvent,
}

#[derive(Debug, Clone)]
pub struct LedgerService {
    db: Database,
    config: LedgerConfig,
}

impl LedgerService {
    pub fn new(db: Database, config: LedgerConfig) -> Self {
        LedgerService { db, config }
    }

    pub fn stock_policy(&self) -> StockPolicy {
        self.config.stock_policy
    }

    /// Deducts recipe consumption of `lines` from stock, all or nothing.
    ///
    /// ## Errors
    /// - `EmptyCart` / `Validation` for unusable lines
    /// - `InsufficientStock` (STRICT) with no item mutated
    /// - `Conflict` once retries are exhausted
    pub async fn apply_deduction(&self, lines: &[CartLine]) -> ServiceResult<LedgerResult> {
        let lines = normalize_cart(lines)?;

        let mut attempt = 0;
        loop {
            match self.try_deduction(&lines).await {
                Err(err) if should_retry(&err, attempt, &self.config, "apply_deduction") => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_deduction(&self, lines: &[CartLine]) -> ServiceResult<LedgerResult> {
        let mut tx = self.db.pool().begin().await?;
        let result = deduct_in(&mut tx, lines, self.config.stock_policy).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Receives `qty` units bought for `total_cost` and revalues the item.
    ///
    /// ## Errors
    /// - `InvalidQuantity` if `qty <= 0`
    /// - `Validation` if `qty` or `total_cost` is out of range, or the new
    ///   stock level would overflow
    /// - `InventoryItemNotFound` for an unknown id
    pub async fn apply_restock(
        &self,
        item_id: &str,
        qty: i64,
        total_cost: Money,
    ) -> ServiceResult<RestockOutcome> {
        let mut attempt = 0;
        loop {
            match self.try_restock(item_id, qty, total_cost).await {
                Err(err) if should_retry(&err, attempt, &self.config, "apply_restock") => {
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_restock(
        &self,
        item_id: &str,
        qty: i64,
        total_cost: Money,
    ) -> ServiceResult<RestockOutcome> {
        let mut tx = self.db.pool().begin().await?;

        let item = InventoryRepository::fetch(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::InventoryItemNotFound(item_id.to_string()))?;

        let plan = plan_restock(&item, qty, total_cost)?;

        InventoryRepository::compare_and_set(
            &mut tx,
            &plan.inventory_item_id,
            plan.stock_after,
            plan.unit_cost_after,
            plan.expected_version,
        )
        .await?;

        let event = RestockEvent {
            id: generate_restock_id(),
            inventory_item_id: plan.inventory_item_id.clone(),
            qty: plan.qty,
            total_cost: plan.total_cost,
            unit_cost_before: plan.unit_cost_before,
            unit_cost_after: plan.unit_cost_after,
            stock_after: plan.stock_after,
            timestamp: Utc::now(),
        };
        RestockRepository::insert(&mut tx, &event).await?;

        let item = InventoryRepository::fetch(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::InventoryItemNotFound(item_id.to_string()))?;

        tx.commit().await?;

        info!(
            item_id = %item.id,
            qty,
            total_cost = %total_cost,
            unit_cost_before = %event.unit_cost_before,
            unit_cost_after = %event.unit_cost_after,
            stock_after = item.stock,
            "Restock applied"
        );

        Ok(RestockOutcome { item, event })
    }

    /// Items whose stock is below their reorder threshold.
    pub async fn low_stock_items(&self) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.db.inventory().list_low_stock().await?)
    }

    /// Restock audit trail of one item, oldest first.
    pub async fn restock_history(&self, item_id: &str) -> ServiceResult<Vec<RestockEvent>> {
        Ok(self.db.restocks().list_for_item(item_id).await?)
    }
}

/// Plans and writes a deduction inside the caller's store transaction.
///
/// `lines` must already be normalized (validated, duplicates merged).
pub(crate) async fn deduct_in(
    conn: &mut SqliteConnection,
    lines: &[CartLine],
    policy: StockPolicy,
) -> ServiceResult<LedgerResult> {
    let mut recipes = HashMap::new();
    for line in lines {
        if let Some(recipe) = RecipeRepository::fetch(&mut *conn, &line.product_id).await? {
            recipes.insert(recipe.product_id.clone(), recipe);
        }
    }

    let required = aggregate_consumption(
        lines.iter().map(|l| (l.product_id.as_str(), l.qty)),
        &recipes,
    )?;

    let mut items = ItemIndex::new();
    for item_id in required.keys() {
        if let Some(item) = InventoryRepository::fetch(&mut *conn, item_id).await? {
            items.insert(item.id.clone(), item);
        }
    }

    let result = plan_deduction(&required, &items, policy)?;

    for change in &result.changes {
        let unit_cost = items
            .get(&change.inventory_item_id)
            .map(|item| item.unit_cost)
            .ok_or_else(|| CoreError::InventoryItemNotFound(change.inventory_item_id.clone()))?;

        InventoryRepository::compare_and_set(
            &mut *conn,
            &change.inventory_item_id,
            change.stock_after,
            unit_cost,
            change.expected_version,
        )
        .await?;
    }

    for warning in &result.warnings {
        warn!(
            item_id = %warning.inventory_item_id,
            name = %warning.name,
            stock_after = warning.stock_after,
            min_stock = warning.min_stock,
            "Stock below minimum"
        );
    }

    Ok(result)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use crate::service::testing::coffee_shop;
    use crate::service::Tally;
    use tally_core::costing::revalue_on_restock;
    use tally_core::{
        ErrorKind, PaymentMethod, Recipe, RecipeIngredient, Session, ValidationError,
        MAX_STOCK_QUANTITY,
    };
    use uuid::Uuid;

    #[tokio::test]
    async fn test_deduction_aggregates_recipes() {
        let tally = coffee_shop(LedgerConfig::default()).await;

        // 2 × Kopi Susu (15 gr) + 1 × Americano (18 gr) = 48 gr coffee, 3 cups
        let result = tally
            .ledger()
            .apply_deduction(&[CartLine::new("p1", 2), CartLine::new("p2", 1)])
            .await
            .unwrap();
        assert_eq!(result.changes.len(), 4);

        let coffee = tally.catalog().get_inventory_item("i1").await.unwrap();
        assert_eq!(coffee.stock, 1000 - 48);
        assert_eq!(coffee.version, 1);
        let cups = tally.catalog().get_inventory_item("i4").await.unwrap();
        assert_eq!(cups.stock, 500 - 3);
    }

    #[tokio::test]
    async fn test_strict_shortage_changes_nothing() {
        let tally = coffee_shop(LedgerConfig::default()).await;

        // 67 × 15 gr = 1005 gr > 1000 gr
        let err = tally
            .ledger()
            .apply_deduction(&[CartLine::new("p1", 67)])
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::InsufficientStock { inventory_item_id, required: 1005, available: 1000 })
                if inventory_item_id == "i1"
        ));
        assert_eq!(err.kind(), ErrorKind::BusinessRule);

        for (id, stock) in [("i1", 1000), ("i2", 5000), ("i3", 2000), ("i4", 500)] {
            let item = tally.catalog().get_inventory_item(id).await.unwrap();
            assert_eq!(item.stock, stock, "{id} must be untouched");
            assert_eq!(item.version, 0);
        }
    }

    #[tokio::test]
    async fn test_permissive_goes_negative_with_warnings() {
        let config = LedgerConfig::default().with_stock_policy(StockPolicy::Permissive);
        let tally = coffee_shop(config).await;

        let result = tally
            .ledger()
            .apply_deduction(&[CartLine::new("p1", 67)])
            .await
            .unwrap();

        let coffee = tally.catalog().get_inventory_item("i1").await.unwrap();
        assert_eq!(coffee.stock, -5);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.inventory_item_id == "i1" && w.stock_after == -5));
    }

    #[tokio::test]
    async fn test_product_without_recipe_consumes_nothing() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let result = tally
            .ledger()
            .apply_deduction(&[CartLine::new("p3", 3)])
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_restock_revalues_and_records_event() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let ledger = tally.ledger();

        // 1000 gr @ 300 + 500 gr for 150 000 → (300 000 + 150 000) / 1500 = 300
        let outcome = ledger
            .apply_restock("i1", 500, Money::from_minor(150_000))
            .await
            .unwrap();
        assert_eq!(outcome.item.stock, 1500);
        assert_eq!(outcome.item.unit_cost, Money::from_minor(300));
        assert_eq!(outcome.event.unit_cost_before, Money::from_minor(300));
        assert_eq!(outcome.event.stock_after, 1500);

        // (1500 × 300 + 250 × 400) / 1750 = 314.28… → 314
        let outcome = ledger
            .apply_restock("i1", 250, Money::from_minor(100_000))
            .await
            .unwrap();
        assert_eq!(outcome.item.unit_cost, Money::from_minor(314));

        let history = ledger.restock_history("i1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].unit_cost_after, Money::from_minor(314));
    }

    #[tokio::test]
    async fn test_sale_then_restock_scenario() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let ledger = tally.ledger();

        ledger.apply_deduction(&[CartLine::new("p1", 2)]).await.unwrap();
        let coffee = tally.catalog().get_inventory_item("i1").await.unwrap();
        assert_eq!(coffee.stock, 970);

        // (970 × 300 + 150 000) / 1470 = 300
        let outcome = ledger
            .apply_restock("i1", 500, Money::from_minor(150_000))
            .await
            .unwrap();
        assert_eq!(outcome.item.stock, 1470);
        assert_eq!(outcome.item.unit_cost, Money::from_minor(300));
        assert_eq!(outcome.item.version, 2);
    }

    #[tokio::test]
    async fn test_restock_rejects_bad_input() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let ledger = tally.ledger();

        let zero = ledger.apply_restock("i1", 0, Money::from_minor(100)).await.unwrap_err();
        assert!(matches!(zero.as_domain(), Some(CoreError::InvalidQuantity { qty: 0 })));

        let negative = ledger.apply_restock("i1", 10, Money::from_minor(-1)).await.unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::Validation);

        let unknown = ledger.apply_restock("nope", 10, Money::from_minor(1)).await.unwrap_err();
        assert_eq!(unknown.kind(), ErrorKind::NotFound);

        assert!(ledger.restock_history("i1").await.unwrap().is_empty());
        let coffee = tally.catalog().get_inventory_item("i1").await.unwrap();
        assert_eq!(coffee.stock, 1000);
    }

    #[tokio::test]
    async fn test_low_stock_items() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        assert!(tally.ledger().low_stock_items().await.unwrap().is_empty());

        // 45 × 18 gr = 810 gr → 190 left, min 200
        tally
            .ledger()
            .apply_deduction(&[CartLine::new("p2", 45)])
            .await
            .unwrap();

        let low = tally.ledger().low_stock_items().await.unwrap();
        let ids: Vec<_> = low.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i1"]);
    }

    #[tokio::test]
    async fn test_restock_quantity_is_bounded() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let ledger = tally.ledger();

        let err = ledger
            .apply_restock("i1", i64::MAX, Money::from_minor(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let err = ledger
            .apply_restock("i1", MAX_STOCK_QUANTITY + 1, Money::from_minor(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let coffee = tally.catalog().get_inventory_item("i1").await.unwrap();
        assert_eq!(coffee.stock, 1000);
        assert_eq!(coffee.version, 0);
        assert!(ledger.restock_history("i1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_consumption_is_rejected() {
        let tally = coffee_shop(LedgerConfig::default()).await;

        let err = tally
            .recipes()
            .upsert_recipe("p3", vec![RecipeIngredient::new("i4", i64::MAX / 2)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::InvalidIngredient { .. })));

        // A row written without going through the registry still cannot wrap
        let mut tx = tally.db().pool().begin().await.unwrap();
        RecipeRepository::insert(
            &mut tx,
            &Recipe {
                product_id: "p3".to_string(),
                ingredients: vec![RecipeIngredient::new("i4", i64::MAX / 2)],
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let err = tally
            .ledger()
            .apply_deduction(&[CartLine::new("p3", 3)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let cups = tally.catalog().get_inventory_item("i4").await.unwrap();
        assert_eq!(cups.stock, 500);
        assert_eq!(cups.version, 0);
    }

    #[tokio::test]
    async fn test_concurrent_restock_and_sale_on_file_database() {
        let path = std::env::temp_dir().join(format!("tally-test-{}.db", Uuid::new_v4()));
        let db_config = DbConfig::new(&path).max_connections(4);
        let tally = Tally::connect(db_config, LedgerConfig::default()).await.unwrap();
        assert!(crate::seed::seed_coffee_shop(&tally).await.unwrap());

        let shift = tally.shifts().open("u2", Money::zero()).await.unwrap();
        let session = Session::for_shift(&shift);

        // Both touch i1 (1000 gr @ 300): restock 500 gr for 100 000,
        // sale of 10 Americano consumes 180 gr
        let ledger = tally.ledger();
        let restock = tokio::spawn(async move {
            ledger
                .apply_restock("i1", 500, Money::from_minor(100_000))
                .await
        });
        let sales = tally.sales();
        let sale = tokio::spawn(async move {
            sales
                .commit_sale(&session, &[CartLine::new("p2", 10)], PaymentMethod::Card, Money::zero())
                .await
        });

        let outcome = restock.await.unwrap().unwrap();
        sale.await.unwrap().unwrap();

        let coffee = tally.catalog().get_inventory_item("i1").await.unwrap();
        assert_eq!(coffee.stock, 1000 + 500 - 180);
        assert_eq!(coffee.version, 2);

        // Restock first: 400 000 / 1500 → 267; sale first: 346 000 / 1320 → 262
        let stock_before = outcome.event.stock_after - 500;
        assert!(stock_before == 1000 || stock_before == 820);
        let expected = revalue_on_restock(
            stock_before,
            Money::from_minor(300),
            500,
            Money::from_minor(100_000),
        );
        assert_eq!(outcome.event.unit_cost_before, Money::from_minor(300));
        assert_eq!(outcome.event.unit_cost_after, expected);
        assert_eq!(coffee.unit_cost, expected);

        tally.db().close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
