//! # Recipe Registry Service
//!
//! Bills of materials: which inventory items one unit of a product consumes.
//!
//! ```text
//! create_recipe ──► DuplicateRecipe if one exists
//! update_recipe ──► RecipeNotFound  if none exists
//! upsert_recipe ──► update when present, create otherwise
//! ```
//!
//! Ingredient rows are validated by [`Recipe::new`] and every referenced
//! product and inventory item must exist.

use sqlx::SqliteConnection;
use tracing::info;

use tally_core::{CoreError, Recipe, RecipeIngredient};

use crate::error::{LedgerError, ServiceResult};
use crate::pool::Database;
use crate::repository::inventory::InventoryRepository;
use crate::repository::product::ProductRepository;
use crate::repository::recipe::RecipeRepository;

#[derive(Debug, Clone)]
pub struct RecipeService {
    db: Database,
}

impl RecipeService {
    pub fn new(db: Database) -> Self {
        RecipeService { db }
    }

    pub async fn get_recipe(&self, product_id: &str) -> ServiceResult<Option<Recipe>> {
        Ok(self.db.recipes().get(product_id).await?)
    }

    pub async fn list_recipes(&self) -> ServiceResult<Vec<Recipe>> {
        Ok(self.db.recipes().list().await?)
    }

    /// Registers the first recipe of a product.
    pub async fn create_recipe(
        &self,
        product_id: &str,
        ingredients: Vec<RecipeIngredient>,
    ) -> ServiceResult<Recipe> {
        let recipe = Recipe::new(product_id, ingredients)?;

        let mut tx = self.db.pool().begin().await?;
        check_references(&mut tx, &recipe).await?;
        RecipeRepository::insert(&mut tx, &recipe)
            .await
            .map_err(|err| {
                if err.is_unique_violation_on("recipes.product_id") {
                    LedgerError::from(CoreError::DuplicateRecipe(recipe.product_id.clone()))
                } else {
                    LedgerError::from(err)
                }
            })?;
        tx.commit().await?;

        info!(product_id = %recipe.product_id, ingredients = recipe.ingredients.len(), "Recipe created");
        Ok(recipe)
    }

    /// Replaces the ingredients of an existing recipe.
    pub async fn update_recipe(
        &self,
        product_id: &str,
        ingredients: Vec<RecipeIngredient>,
    ) -> ServiceResult<Recipe> {
        let recipe = Recipe::new(product_id, ingredients)?;

        let mut tx = self.db.pool().begin().await?;
        check_references(&mut tx, &recipe).await?;
        if !RecipeRepository::replace(&mut tx, &recipe).await? {
            return Err(CoreError::RecipeNotFound(recipe.product_id).into());
        }
        tx.commit().await?;

        info!(product_id = %recipe.product_id, ingredients = recipe.ingredients.len(), "Recipe updated");
        Ok(recipe)
    }

    /// Creates or replaces the recipe of a product in one store transaction.
    pub async fn upsert_recipe(
        &self,
        product_id: &str,
        ingredients: Vec<RecipeIngredient>,
    ) -> ServiceResult<Recipe> {
        let recipe = Recipe::new(product_id, ingredients)?;

        let mut tx = self.db.pool().begin().await?;
        check_references(&mut tx, &recipe).await?;
        let replaced = RecipeRepository::replace(&mut tx, &recipe).await?;
        if !replaced {
            RecipeRepository::insert(&mut tx, &recipe).await?;
        }
        tx.commit().await?;

        info!(product_id = %recipe.product_id, replaced, "Recipe saved");
        Ok(recipe)
    }

    pub async fn delete_recipe(&self, product_id: &str) -> ServiceResult<()> {
        if !self.db.recipes().delete(product_id).await? {
            return Err(CoreError::RecipeNotFound(product_id.to_string()).into());
        }

        info!(product_id = %product_id, "Recipe deleted");
        Ok(())
    }
}

async fn check_references(conn: &mut SqliteConnection, recipe: &Recipe) -> ServiceResult<()> {
    if ProductRepository::fetch(&mut *conn, &recipe.product_id)
        .await?
        .is_none()
    {
        return Err(CoreError::ProductNotFound(recipe.product_id.clone()).into());
    }

    for ingredient in &recipe.ingredients {
        if InventoryRepository::fetch(&mut *conn, &ingredient.inventory_item_id)
            .await?
            .is_none()
        {
            return Err(
                CoreError::InventoryItemNotFound(ingredient.inventory_item_id.clone()).into(),
            );
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::coffee_shop;
    use tally_core::LedgerConfig;

    #[tokio::test]
    async fn test_seeded_recipes_keep_order() {
        let tally = coffee_shop(LedgerConfig::default()).await;

        let recipe = tally.recipes().get_recipe("p1").await.unwrap().unwrap();
        let items: Vec<_> = recipe
            .ingredients
            .iter()
            .map(|i| (i.inventory_item_id.as_str(), i.qty_per_unit))
            .collect();
        assert_eq!(items, vec![("i1", 15), ("i2", 100), ("i3", 20), ("i4", 1)]);

        assert_eq!(tally.recipes().list_recipes().await.unwrap().len(), 2);
        assert!(tally.recipes().get_recipe("p3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_is_create_only() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let recipes = tally.recipes();

        let err = recipes
            .create_recipe("p2", vec![RecipeIngredient::new("i1", 20)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::DuplicateRecipe(id)) if id == "p2"));

        let recipe = recipes
            .create_recipe("p3", vec![RecipeIngredient::new("i4", 1)])
            .await
            .unwrap();
        assert_eq!(recipe.ingredients.len(), 1);
        assert!(recipes.get_recipe("p3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_and_upsert() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let recipes = tally.recipes();

        let err = recipes
            .update_recipe("p3", vec![RecipeIngredient::new("i4", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::RecipeNotFound(_))));

        recipes
            .update_recipe("p2", vec![RecipeIngredient::new("i1", 20), RecipeIngredient::new("i4", 1)])
            .await
            .unwrap();
        let p2 = recipes.get_recipe("p2").await.unwrap().unwrap();
        assert_eq!(p2.ingredients[0].qty_per_unit, 20);

        recipes
            .upsert_recipe("p3", vec![RecipeIngredient::new("i2", 50)])
            .await
            .unwrap();
        recipes
            .upsert_recipe("p3", vec![RecipeIngredient::new("i2", 60)])
            .await
            .unwrap();
        let p3 = recipes.get_recipe("p3").await.unwrap().unwrap();
        assert_eq!(p3.ingredients, vec![RecipeIngredient::new("i2", 60)]);
    }

    #[tokio::test]
    async fn test_rejects_bad_ingredients_and_references() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        let recipes = tally.recipes();

        let err = recipes
            .create_recipe("p3", vec![RecipeIngredient::new("i1", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::InvalidIngredient { .. })));

        let err = recipes
            .create_recipe("ghost", vec![RecipeIngredient::new("i1", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));

        let err = recipes
            .create_recipe("p3", vec![RecipeIngredient::new("ghost", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::InventoryItemNotFound(_))));

        assert!(recipes.get_recipe("p3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_recipe() {
        let tally = coffee_shop(LedgerConfig::default()).await;
        tally.recipes().delete_recipe("p2").await.unwrap();

        let err = tally.recipes().delete_recipe("p2").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::RecipeNotFound(_))));

        // p1 still uses coffee and cups
        assert!(tally.catalog().delete_inventory_item("i1").await.is_err());
        assert!(tally.recipes().get_recipe("p1").await.unwrap().is_some());
    }
}
