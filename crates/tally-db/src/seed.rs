//! # Starter Catalog
//!
//! A small coffee shop: four ingredients, three products, two recipes.
//!
//! ```text
//! Kopi Susu Gula Aren (18 000)   i1 15 gr  i2 100 ml  i3 20 ml  i4 1 pcs
//! Americano           (15 000)   i1 18 gr  i4 1 pcs
//! Croissant           (25 000)   no recipe (bought in)
//! ```
//!
//! Ids are fixed (`p1`, `i1`, ...) so demos and tests can refer to them.

use chrono::Utc;
use tracing::info;

use tally_core::{InventoryItem, Money, Product, Recipe, RecipeIngredient, StockUnit};

use crate::error::ServiceResult;
use crate::repository::recipe::RecipeRepository;
use crate::service::Tally;

/// (id, name, unit, stock, unit_cost, min_stock)
const ITEMS: &[(&str, &str, StockUnit, i64, i64, i64)] = &[
    ("i1", "Kopi Arabica", StockUnit::Gram, 1000, 300, 200),
    ("i2", "Susu UHT", StockUnit::Milliliter, 5000, 20, 1000),
    ("i3", "Gula Aren", StockUnit::Milliliter, 2000, 50, 500),
    ("i4", "Cup 12oz", StockUnit::Piece, 500, 800, 50),
];

/// (id, name, price, category, image)
const PRODUCTS: &[(&str, &str, i64, &str, &str)] = &[
    ("p1", "Kopi Susu Gula Aren", 18_000, "Coffee", "☕"),
    ("p2", "Americano", 15_000, "Coffee", "☕"),
    ("p3", "Croissant", 25_000, "Food", "🥐"),
];

/// (product_id, [(inventory_item_id, qty_per_unit)])
const RECIPES: &[(&str, &[(&str, i64)])] = &[
    ("p1", &[("i1", 15), ("i2", 100), ("i3", 20), ("i4", 1)]),
    ("p2", &[("i1", 18), ("i4", 1)]),
];

/// Loads the starter catalog into an empty store.
///
/// ## Returns
/// `Ok(false)` without writing anything if products or items already exist.
pub async fn seed_coffee_shop(tally: &Tally) -> ServiceResult<bool> {
    let db = tally.db();
    if db.products().count().await? > 0 || db.inventory().count().await? > 0 {
        info!("Catalog not empty, skipping seed");
        return Ok(false);
    }

    let now = Utc::now();

    let inventory = db.inventory();
    for &(id, name, unit, stock, unit_cost, min_stock) in ITEMS {
        inventory
            .insert(&InventoryItem {
                id: id.to_string(),
                name: name.to_string(),
                unit,
                stock,
                unit_cost: Money::from_minor(unit_cost),
                min_stock,
                version: 0,
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let products = db.products();
    for &(id, name, price, category, image) in PRODUCTS {
        products
            .insert(&Product {
                id: id.to_string(),
                name: name.to_string(),
                price: Money::from_minor(price),
                category: category.to_string(),
                image: Some(image.to_string()),
                created_at: now,
                updated_at: now,
            })
            .await?;
    }

    let mut tx = db.pool().begin().await?;
    for &(product_id, ingredients) in RECIPES {
        let recipe = Recipe::new(
            product_id,
            ingredients
                .iter()
                .map(|&(item_id, qty)| RecipeIngredient::new(item_id, qty))
                .collect(),
        )?;
        RecipeRepository::insert(&mut tx, &recipe).await?;
    }
    tx.commit().await?;

    info!(
        items = ITEMS.len(),
        products = PRODUCTS.len(),
        recipes = RECIPES.len(),
        "Starter catalog loaded"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use tally_core::LedgerConfig;

    #[tokio::test]
    async fn test_seed_runs_once() {
        let tally = Tally::connect(DbConfig::in_memory(), LedgerConfig::default())
            .await
            .unwrap();

        assert!(seed_coffee_shop(&tally).await.unwrap());
        assert!(!seed_coffee_shop(&tally).await.unwrap());

        assert_eq!(tally.db().products().count().await.unwrap(), 3);
        assert_eq!(tally.db().inventory().count().await.unwrap(), 4);
        assert_eq!(tally.recipes().list_recipes().await.unwrap().len(), 2);
    }
}
