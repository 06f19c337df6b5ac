//! # Costing Engine
//!
//! Weighted-average (moving-average) unit cost and cost of goods sold.
//!
//! ## Restock Revaluation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock 1000 gr @ 300          purchase 500 gr for 150 000              │
//! │        │                                │                               │
//! │        └──────────────┬─────────────────┘                               │
//! │                       ▼                                                 │
//! │   (1000 × 300 + 150 000) / (1000 + 500) = 450 000 / 1500 = 300         │
//! │                                                                         │
//! │   stock + qty ≤ 0  →  unit cost left unchanged                          │
//! │   fractional       →  round half up to the minor unit                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## COGS
//! Reports recompute COGS from the *current* unit cost of each ingredient,
//! not the cost at the moment of sale. Historical COGS therefore moves when
//! a later restock changes the average; this is a known limitation.

use std::collections::HashMap;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{InventoryItem, Recipe};
use crate::validation::overflow;

/// Inventory items keyed by id, as read for a costing pass.
pub type ItemIndex = HashMap<String, InventoryItem>;

/// Builds an [`ItemIndex`] from a list of items.
pub fn index_items(items: impl IntoIterator<Item = InventoryItem>) -> ItemIndex {
    items.into_iter().map(|i| (i.id.clone(), i)).collect()
}

/// New weighted-average unit cost after receiving `purchased_qty` units that
/// cost `purchased_total` in total.
///
/// ## Example
/// ```rust
/// use tally_core::costing::revalue_on_restock;
/// use tally_core::money::Money;
///
/// let cost = revalue_on_restock(1000, Money::from_minor(300), 500, Money::from_minor(150_000));
/// assert_eq!(cost.minor(), 300);
/// ```
pub fn revalue_on_restock(
    stock: i64,
    unit_cost: Money,
    purchased_qty: i64,
    purchased_total: Money,
) -> Money {
    let new_qty = stock as i128 + purchased_qty as i128;
    if new_qty <= 0 {
        return unit_cost;
    }

    let value = stock as i128 * unit_cost.minor() as i128 + purchased_total.minor() as i128;
    Money::from_ratio_half_up(value, new_qty)
}

/// Ingredient cost of one unit of a product.
///
/// Ingredients whose inventory item no longer exists contribute zero.
pub fn unit_cogs(recipe: &Recipe, items: &ItemIndex) -> CoreResult<Money> {
    let mut total = Money::zero();
    for ing in &recipe.ingredients {
        let Some(item) = items.get(&ing.inventory_item_id) else {
            continue;
        };
        let cost = item
            .unit_cost
            .checked_mul_quantity(ing.qty_per_unit)
            .ok_or_else(|| overflow("cost of goods sold"))?;
        total = total
            .checked_add(cost)
            .ok_or_else(|| overflow("cost of goods sold"))?;
    }
    Ok(total)
}

/// COGS of selling `qty` units of a product.
///
/// A product without a recipe costs zero.
pub fn line_cogs(recipe: Option<&Recipe>, qty: i64, items: &ItemIndex) -> CoreResult<Money> {
    match recipe {
        Some(recipe) => Ok(unit_cogs(recipe, items)?
            .checked_mul_quantity(qty)
            .ok_or_else(|| overflow("cost of goods sold"))?),
        None => Ok(Money::zero()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RecipeIngredient, StockUnit};
    use chrono::Utc;

    fn item(id: &str, stock: i64, unit_cost: i64) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: id.to_string(),
            name: id.to_string(),
            unit: StockUnit::Gram,
            stock,
            unit_cost: Money::from_minor(unit_cost),
            min_stock: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_restock_exact_average() {
        let cost = revalue_on_restock(1000, Money::from_minor(300), 500, Money::from_minor(150_000));
        assert_eq!(cost.minor(), 300);
    }

    #[test]
    fn test_restock_cheaper_batch_lowers_average() {
        // (1000×300 + 500×100) / 1500 = 233.33 → 233
        let cost = revalue_on_restock(1000, Money::from_minor(300), 500, Money::from_minor(50_000));
        assert_eq!(cost.minor(), 233);
    }

    #[test]
    fn test_restock_rounds_half_up() {
        // (1×10 + 5) / 2 = 7.5 → 8
        let cost = revalue_on_restock(1, Money::from_minor(10), 1, Money::from_minor(5));
        assert_eq!(cost.minor(), 8);
    }

    #[test]
    fn test_restock_from_empty_takes_purchase_price() {
        let cost = revalue_on_restock(0, Money::from_minor(300), 250, Money::from_minor(80_000));
        assert_eq!(cost.minor(), 320);
    }

    #[test]
    fn test_restock_non_positive_total_keeps_cost() {
        let cost = revalue_on_restock(-100, Money::from_minor(300), 100, Money::from_minor(99_999));
        assert_eq!(cost.minor(), 300);
    }

    #[test]
    fn test_restock_sequence_is_deterministic() {
        let steps = [(500, 150_000), (250, 100_000), (1, 7)];
        let (mut stock, mut cost) = (1000_i64, Money::from_minor(300));
        let mut seen = Vec::new();
        for (qty, total) in steps {
            let expected = Money::from_ratio_half_up(
                stock as i128 * cost.minor() as i128 + total as i128,
                (stock + qty) as i128,
            );
            cost = revalue_on_restock(stock, cost, qty, Money::from_minor(total));
            assert_eq!(cost, expected);
            stock += qty;
            seen.push(cost.minor());
        }
        assert_eq!(seen, vec![300, 314, 314]);
    }

    #[test]
    fn test_line_cogs() {
        let items = index_items(vec![item("i1", 1000, 300), item("i4", 500, 800)]);
        let recipe = Recipe::new(
            "p2",
            vec![RecipeIngredient::new("i1", 18), RecipeIngredient::new("i4", 1)],
        )
        .unwrap();

        // 18×300 + 1×800 = 6200 per cup
        assert_eq!(unit_cogs(&recipe, &items).unwrap().minor(), 6_200);
        assert_eq!(line_cogs(Some(&recipe), 3, &items).unwrap().minor(), 18_600);
    }

    #[test]
    fn test_line_cogs_without_recipe_is_zero() {
        let items = index_items(vec![item("i1", 1000, 300)]);
        assert_eq!(line_cogs(None, 5, &items).unwrap(), Money::zero());
    }

    #[test]
    fn test_missing_ingredient_costs_nothing() {
        let items = index_items(vec![item("i1", 1000, 300)]);
        let recipe = Recipe::new(
            "p2",
            vec![RecipeIngredient::new("i1", 18), RecipeIngredient::new("gone", 1)],
        )
        .unwrap();
        assert_eq!(unit_cogs(&recipe, &items).unwrap().minor(), 5_400);
    }

    #[test]
    fn test_line_cogs_overflow_is_an_error() {
        let items = index_items(vec![item("i1", 1000, i64::MAX / 2)]);
        let recipe = Recipe::new("p2", vec![RecipeIngredient::new("i1", 3)]).unwrap();
        assert!(unit_cogs(&recipe, &items).is_err());
        assert!(line_cogs(Some(&recipe), 1, &items).is_err());
    }
}
