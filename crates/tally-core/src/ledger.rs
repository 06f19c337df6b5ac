//! # Inventory Ledger Planning
//!
//! Decides, without touching the store, what a sale or restock does to stock.
//! `tally-db` applies the resulting plan inside one store transaction with a
//! compare-and-swap on each item's `version`.
//!
//! ## Deduction Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart: 2 × Kopi Susu, 1 × Americano                                     │
//! │        │                                                                │
//! │        ▼  aggregate_consumption (per inventory item, across all lines)  │
//! │  coffee: 2×15 + 1×18 = 48 gr     cup: 2×1 + 1×1 = 3 pcs   ...           │
//! │        │                                                                │
//! │        ▼  plan_deduction                                                │
//! │  STRICT      any stock_after < 0 → InsufficientStock, NOTHING planned   │
//! │  PERMISSIVE  negative allowed, LowStockWarning per item < min_stock     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  LedgerResult { changes[], warnings[] }  (all-or-nothing)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::costing::{revalue_on_restock, ItemIndex};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{InventoryItem, Recipe};
use crate::validation::{overflow, validate_non_negative_amount};
use crate::MAX_STOCK_QUANTITY;

// =============================================================================
// Stock Policy
// =============================================================================

/// What happens when a sale needs more stock than is on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum StockPolicy {
    /// Reject the whole sale.
    #[default]
    Strict,
    /// Let stock go negative and warn.
    Permissive,
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockPolicy::Strict => write!(f, "STRICT"),
            StockPolicy::Permissive => write!(f, "PERMISSIVE"),
        }
    }
}

impl FromStr for StockPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STRICT" => Ok(StockPolicy::Strict),
            "PERMISSIVE" => Ok(StockPolicy::Permissive),
            other => Err(ValidationError::InvalidFormat {
                field: "stock policy".to_string(),
                reason: format!("expected STRICT or PERMISSIVE, got '{other}'"),
            }),
        }
    }
}

// =============================================================================
// Plans & Results
// =============================================================================

/// One item write: new stock, guarded by the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockChange {
    pub inventory_item_id: String,
    pub stock_before: i64,
    pub stock_after: i64,
    pub expected_version: i64,
}

/// Stock ended below the reorder threshold (possibly below zero).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockWarning {
    pub inventory_item_id: String,
    pub name: String,
    pub stock_after: i64,
    pub min_stock: i64,
}

/// Outcome of a deduction: every change to apply plus warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LedgerResult {
    /// Ordered by inventory item id.
    pub changes: Vec<StockChange>,
    pub warnings: Vec<LowStockWarning>,
}

impl LedgerResult {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A validated restock, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockPlan {
    pub inventory_item_id: String,
    pub qty: i64,
    pub total_cost: Money,
    pub stock_before: i64,
    pub stock_after: i64,
    pub unit_cost_before: Money,
    pub unit_cost_after: Money,
    pub expected_version: i64,
}

// =============================================================================
// Deduction
// =============================================================================

/// Sums ingredient consumption per inventory item across all lines.
///
/// Lines are `(product_id, qty)`. Products without a recipe consume nothing.
/// A `BTreeMap` keeps the write order deterministic (by item id), so two
/// concurrent sales lock/update items in the same order.
///
/// ## Errors
/// `Validation(OutOfRange)` if a total leaves the i64 range.
pub fn aggregate_consumption<'a>(
    lines: impl IntoIterator<Item = (&'a str, i64)>,
    recipes: &HashMap<String, Recipe>,
) -> CoreResult<BTreeMap<String, i64>> {
    let mut required: BTreeMap<String, i64> = BTreeMap::new();
    for (product_id, qty) in lines {
        if let Some(recipe) = recipes.get(product_id) {
            for (item_id, amount) in recipe.consumption(qty)? {
                let total = required.entry(item_id.to_string()).or_insert(0);
                *total = total
                    .checked_add(amount)
                    .ok_or_else(|| overflow("ingredient consumption"))?;
            }
        }
    }
    Ok(required)
}

/// Plans an all-or-nothing deduction of `required` from `items`.
///
/// ## Errors
/// - `InventoryItemNotFound` if a required item is missing from `items`
/// - `InsufficientStock` (STRICT only) for the first item, by id, that would
///   go negative; no change is planned
pub fn plan_deduction(
    required: &BTreeMap<String, i64>,
    items: &ItemIndex,
    policy: StockPolicy,
) -> CoreResult<LedgerResult> {
    let mut result = LedgerResult::default();

    for (item_id, &amount) in required {
        let item = items
            .get(item_id)
            .ok_or_else(|| CoreError::InventoryItemNotFound(item_id.clone()))?;

        let stock_after = item
            .stock
            .checked_sub(amount)
            .ok_or_else(|| overflow("stock"))?;
        if stock_after < 0 && policy == StockPolicy::Strict {
            return Err(CoreError::InsufficientStock {
                inventory_item_id: item_id.clone(),
                required: amount,
                available: item.stock,
            });
        }

        if stock_after < item.min_stock {
            result.warnings.push(low_stock_warning(item, stock_after));
        }

        result.changes.push(StockChange {
            inventory_item_id: item_id.clone(),
            stock_before: item.stock,
            stock_after,
            expected_version: item.version,
        });
    }

    Ok(result)
}

fn low_stock_warning(item: &InventoryItem, stock_after: i64) -> LowStockWarning {
    LowStockWarning {
        inventory_item_id: item.id.clone(),
        name: item.name.clone(),
        stock_after,
        min_stock: item.min_stock,
    }
}

// =============================================================================
// Restock
// =============================================================================

/// Validates a restock and computes the revalued item state.
///
/// ## Errors
/// - `InvalidQuantity` if `qty <= 0` (a zero restock is never a silent no-op)
/// - `Validation` if `qty` exceeds [`MAX_STOCK_QUANTITY`], `total_cost` is
///   negative or too large, or the new stock level would overflow
pub fn plan_restock(item: &InventoryItem, qty: i64, total_cost: Money) -> CoreResult<RestockPlan> {
    if qty <= 0 {
        return Err(CoreError::InvalidQuantity { qty });
    }
    if qty > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "restock quantity".to_string(),
            min: 1,
            max: MAX_STOCK_QUANTITY,
        }
        .into());
    }
    validate_non_negative_amount("total cost", total_cost)?;

    let stock_after = item
        .stock
        .checked_add(qty)
        .ok_or_else(|| overflow("stock"))?;

    let unit_cost_after = revalue_on_restock(item.stock, item.unit_cost, qty, total_cost);

    Ok(RestockPlan {
        inventory_item_id: item.id.clone(),
        qty,
        total_cost,
        stock_before: item.stock,
        stock_after,
        unit_cost_before: item.unit_cost,
        unit_cost_after,
        expected_version: item.version,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::index_items;
    use crate::types::{RecipeIngredient, StockUnit};
    use chrono::Utc;

    fn item(id: &str, stock: i64, min_stock: i64) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: id.to_string(),
            name: format!("item {id}"),
            unit: StockUnit::Gram,
            stock,
            unit_cost: Money::from_minor(300),
            min_stock,
            version: 7,
            created_at: now,
            updated_at: now,
        }
    }

    fn recipes() -> HashMap<String, Recipe> {
        let mut map = HashMap::new();
        map.insert(
            "p1".to_string(),
            Recipe::new(
                "p1",
                vec![RecipeIngredient::new("i1", 15), RecipeIngredient::new("i4", 1)],
            )
            .unwrap(),
        );
        map.insert(
            "p2".to_string(),
            Recipe::new(
                "p2",
                vec![RecipeIngredient::new("i1", 18), RecipeIngredient::new("i4", 1)],
            )
            .unwrap(),
        );
        map
    }

    #[test]
    fn test_aggregates_shared_ingredients() {
        let required =
            aggregate_consumption(vec![("p1", 2), ("p2", 1), ("p3", 4)], &recipes()).unwrap();
        assert_eq!(required.get("i1"), Some(&48));
        assert_eq!(required.get("i4"), Some(&3));
        assert_eq!(required.len(), 2);
    }

    #[test]
    fn test_scenario_two_cups_deduct_thirty_grams() {
        let required = aggregate_consumption(vec![("p1", 2)], &recipes()).unwrap();
        let items = index_items(vec![item("i1", 1000, 200), item("i4", 500, 50)]);
        let result = plan_deduction(&required, &items, StockPolicy::Strict).unwrap();

        let coffee = &result.changes[0];
        assert_eq!(coffee.inventory_item_id, "i1");
        assert_eq!(coffee.stock_after, 970);
        assert_eq!(coffee.stock_before, 1000);
        assert_eq!(coffee.expected_version, 7);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_strict_rejects_whole_plan() {
        // i1 is short, i4 has plenty: nothing may be planned
        let required = aggregate_consumption(vec![("p1", 10)], &recipes()).unwrap();
        let items = index_items(vec![item("i1", 100, 0), item("i4", 500, 0)]);
        let err = plan_deduction(&required, &items, StockPolicy::Strict).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                inventory_item_id,
                required,
                available,
            } => {
                assert_eq!(inventory_item_id, "i1");
                assert_eq!(required, 150);
                assert_eq!(available, 100);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_permissive_goes_negative_with_warning() {
        let required = aggregate_consumption(vec![("p1", 10)], &recipes()).unwrap();
        let items = index_items(vec![item("i1", 100, 20), item("i4", 500, 50)]);
        let result = plan_deduction(&required, &items, StockPolicy::Permissive).unwrap();

        assert_eq!(result.changes[0].stock_after, -50);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].inventory_item_id, "i1");
        assert_eq!(result.warnings[0].min_stock, 20);
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let required = aggregate_consumption(vec![("p1", 1)], &recipes()).unwrap();
        let items = index_items(vec![item("i1", 100, 0)]);
        assert!(matches!(
            plan_deduction(&required, &items, StockPolicy::Strict).unwrap_err(),
            CoreError::InventoryItemNotFound(id) if id == "i4"
        ));
    }

    #[test]
    fn test_plan_restock() {
        let plan = plan_restock(&item("i1", 1000, 0), 500, Money::from_minor(150_000)).unwrap();
        assert_eq!(plan.stock_after, 1500);
        assert_eq!(plan.unit_cost_after, Money::from_minor(300));
        assert_eq!(plan.expected_version, 7);
    }

    #[test]
    fn test_plan_restock_rejects_zero_and_negative() {
        let it = item("i1", 1000, 0);
        assert!(matches!(
            plan_restock(&it, 0, Money::from_minor(100)).unwrap_err(),
            CoreError::InvalidQuantity { qty: 0 }
        ));
        assert!(matches!(
            plan_restock(&it, 10, Money::from_minor(-1)).unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn test_plan_restock_rejects_oversized_quantity() {
        let it = item("i1", 1000, 0);
        assert!(plan_restock(&it, MAX_STOCK_QUANTITY, Money::from_minor(1)).is_ok());
        assert!(matches!(
            plan_restock(&it, i64::MAX, Money::from_minor(1)).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));

        // Stock already near the top of the range
        let full = item("i1", i64::MAX - 10, 0);
        assert!(matches!(
            plan_restock(&full, 11, Money::from_minor(1)).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_aggregate_overflow_is_an_error() {
        let mut recipes = HashMap::new();
        recipes.insert(
            "p3".to_string(),
            Recipe {
                product_id: "p3".to_string(),
                ingredients: vec![RecipeIngredient::new("i4", i64::MAX / 4)],
            },
        );
        // Each line fits, the sum does not
        assert!(matches!(
            aggregate_consumption(vec![("p3", 3), ("p3", 3)], &recipes).unwrap_err(),
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_stock_policy_parsing() {
        assert_eq!("strict".parse::<StockPolicy>().unwrap(), StockPolicy::Strict);
        assert_eq!(
            " Permissive ".parse::<StockPolicy>().unwrap(),
            StockPolicy::Permissive
        );
        assert!("lenient".parse::<StockPolicy>().is_err());
        assert_eq!(StockPolicy::default(), StockPolicy::Strict);
    }
}
