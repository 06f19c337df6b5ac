//! # Recipe Rules
//!
//! Boundary checks for bills of materials.
//!
//! ```text
//! ingredients as entered            result
//! ─────────────────────────────     ──────────────────────────────────
//! [(i1, 15), (i2, 100)]         →   Ok(Recipe)
//! []                            →   InvalidIngredient ("at least one")
//! [(i1, 0)]                     →   InvalidIngredient ("must be > 0")
//! [(i1, 2_000_000)]             →   InvalidIngredient ("at most 1 000 000")
//! [(i1, 15), (i1, 3)]           →   InvalidIngredient ("listed twice")
//! ```
//!
//! Invalid rows are rejected, never silently dropped.

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::types::{Recipe, RecipeIngredient};
use crate::validation::{overflow, validate_id};
use crate::MAX_QTY_PER_UNIT;

impl Recipe {
    /// Builds a recipe, rejecting any unusable ingredient row.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::{Recipe, RecipeIngredient};
    ///
    /// let recipe = Recipe::new("p2", vec![
    ///     RecipeIngredient::new("i1", 18),
    ///     RecipeIngredient::new("i4", 1),
    /// ]).unwrap();
    /// assert_eq!(recipe.ingredients.len(), 2);
    ///
    /// assert!(Recipe::new("p2", vec![RecipeIngredient::new("i1", 0)]).is_err());
    /// ```
    pub fn new(
        product_id: impl Into<String>,
        ingredients: Vec<RecipeIngredient>,
    ) -> CoreResult<Recipe> {
        let product_id = product_id.into();
        validate_id("product id", &product_id)?;

        if ingredients.is_empty() {
            return Err(CoreError::InvalidIngredient {
                inventory_item_id: String::new(),
                reason: "a recipe needs at least one ingredient".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(ingredients.len());
        for ingredient in &ingredients {
            if ingredient.inventory_item_id.trim().is_empty() {
                return Err(CoreError::InvalidIngredient {
                    inventory_item_id: ingredient.inventory_item_id.clone(),
                    reason: "inventory item id is required".to_string(),
                });
            }
            if ingredient.qty_per_unit <= 0 {
                return Err(CoreError::InvalidIngredient {
                    inventory_item_id: ingredient.inventory_item_id.clone(),
                    reason: format!(
                        "quantity per unit must be greater than zero, got {}",
                        ingredient.qty_per_unit
                    ),
                });
            }
            if ingredient.qty_per_unit > MAX_QTY_PER_UNIT {
                return Err(CoreError::InvalidIngredient {
                    inventory_item_id: ingredient.inventory_item_id.clone(),
                    reason: format!(
                        "quantity per unit must be at most {MAX_QTY_PER_UNIT}, got {}",
                        ingredient.qty_per_unit
                    ),
                });
            }
            if !seen.insert(ingredient.inventory_item_id.as_str()) {
                return Err(CoreError::InvalidIngredient {
                    inventory_item_id: ingredient.inventory_item_id.clone(),
                    reason: "listed more than once".to_string(),
                });
            }
        }

        Ok(Recipe {
            product_id,
            ingredients,
        })
    }

    /// Ingredient consumption for selling `qty` units of the product.
    ///
    /// ## Errors
    /// `Validation(OutOfRange)` if `qty_per_unit × qty` leaves the i64 range.
    pub fn consumption(&self, qty: i64) -> CoreResult<Vec<(&str, i64)>> {
        self.ingredients
            .iter()
            .map(|ing| {
                ing.qty_per_unit
                    .checked_mul(qty)
                    .map(|amount| (ing.inventory_item_id.as_str(), amount))
                    .ok_or_else(|| CoreError::from(overflow("ingredient consumption")))
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn kopi_susu() -> Vec<RecipeIngredient> {
        vec![
            RecipeIngredient::new("i1", 15),
            RecipeIngredient::new("i2", 100),
            RecipeIngredient::new("i3", 20),
            RecipeIngredient::new("i4", 1),
        ]
    }

    #[test]
    fn test_valid_recipe_keeps_order() {
        let recipe = Recipe::new("p1", kopi_susu()).unwrap();
        let ids: Vec<_> = recipe
            .ingredients
            .iter()
            .map(|i| i.inventory_item_id.as_str())
            .collect();
        assert_eq!(ids, vec!["i1", "i2", "i3", "i4"]);
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut rows = kopi_susu();
        rows[2].qty_per_unit = 0;
        let err = Recipe::new("p1", rows).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidIngredient { ref inventory_item_id, .. } if inventory_item_id == "i3"
        ));
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let err = Recipe::new("p1", vec![RecipeIngredient::new("i1", -5)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidIngredient { .. }));
    }

    #[test]
    fn test_empty_and_duplicate_rejected() {
        assert!(matches!(
            Recipe::new("p1", vec![]).unwrap_err(),
            CoreError::InvalidIngredient { .. }
        ));
        assert!(matches!(
            Recipe::new(
                "p1",
                vec![RecipeIngredient::new("i1", 15), RecipeIngredient::new("i1", 3)]
            )
            .unwrap_err(),
            CoreError::InvalidIngredient { .. }
        ));
    }

    #[test]
    fn test_oversized_quantity_rejected() {
        assert!(Recipe::new("p1", vec![RecipeIngredient::new("i1", MAX_QTY_PER_UNIT)]).is_ok());

        let err = Recipe::new("p1", vec![RecipeIngredient::new("i1", MAX_QTY_PER_UNIT + 1)])
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidIngredient { .. }));
    }

    #[test]
    fn test_missing_product_id_rejected() {
        assert!(matches!(
            Recipe::new(" ", kopi_susu()).unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn test_consumption_scales_with_quantity() {
        let recipe = Recipe::new("p1", kopi_susu()).unwrap();
        let used = recipe.consumption(2).unwrap();
        assert_eq!(used[0], ("i1", 30));
        assert_eq!(used[1], ("i2", 200));
    }

    #[test]
    fn test_consumption_overflow_is_an_error() {
        // Rows loaded from the store skip `Recipe::new`
        let recipe = Recipe {
            product_id: "p3".to_string(),
            ingredients: vec![RecipeIngredient::new("i4", i64::MAX / 2)],
        };
        assert!(matches!(
            recipe.consumption(3),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }
}
