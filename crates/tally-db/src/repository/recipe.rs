//! # Recipe Repository
//!
//! Bills of materials, one per product.
//!
//! ```text
//! recipes                      recipe_ingredients
//! ┌────────────────┐           ┌────────────┬──────────┬─────────┬─────┐
//! │ product_id (PK)│◄──────────│ product_id │ position │ item_id │ qty │
//! └────────────────┘           ├────────────┼──────────┼─────────┼─────┤
//!                              │ p1         │ 0        │ i1      │ 15  │
//!                              │ p1         │ 1        │ i2      │ 100 │
//!                              └────────────┴──────────┴─────────┴─────┘
//! ```
//!
//! `position` keeps ingredients in the order they were entered.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tally_core::{Recipe, RecipeIngredient};

#[derive(Debug, FromRow)]
struct IngredientRow {
    product_id: String,
    inventory_item_id: String,
    qty_per_unit: i64,
}

/// Repository for recipe database operations.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    /// Creates a new RecipeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RecipeRepository { pool }
    }

    /// Gets the recipe of a product.
    pub async fn get(&self, product_id: &str) -> DbResult<Option<Recipe>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, product_id).await
    }

    /// Gets the recipe of a product inside an open store transaction.
    pub async fn fetch(conn: &mut SqliteConnection, product_id: &str) -> DbResult<Option<Recipe>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM recipes WHERE product_id = ?1)")
                .bind(product_id)
                .fetch_one(&mut *conn)
                .await?;

        if !exists {
            return Ok(None);
        }

        let rows = sqlx::query_as::<_, IngredientRow>(
            r#"
            SELECT product_id, inventory_item_id, qty_per_unit
            FROM recipe_ingredients
            WHERE product_id = ?1
            ORDER BY position
            "#,
        )
        .bind(product_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(Recipe {
            product_id: product_id.to_string(),
            ingredients: rows
                .into_iter()
                .map(|r| RecipeIngredient::new(r.inventory_item_id, r.qty_per_unit))
                .collect(),
        }))
    }

    /// Lists every recipe, ordered by product id.
    pub async fn list(&self) -> DbResult<Vec<Recipe>> {
        let product_ids: Vec<String> =
            sqlx::query_scalar("SELECT product_id FROM recipes ORDER BY product_id")
                .fetch_all(&self.pool)
                .await?;

        let rows = sqlx::query_as::<_, IngredientRow>(
            r#"
            SELECT product_id, inventory_item_id, qty_per_unit
            FROM recipe_ingredients
            ORDER BY product_id, position
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<String, Vec<RecipeIngredient>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.product_id)
                .or_default()
                .push(RecipeIngredient::new(row.inventory_item_id, row.qty_per_unit));
        }

        let recipes = product_ids
            .into_iter()
            .map(|product_id| Recipe {
                ingredients: grouped.remove(&product_id).unwrap_or_default(),
                product_id,
            })
            .collect::<Vec<_>>();

        debug!(count = recipes.len(), "Listed recipes");
        Ok(recipes)
    }

    /// All recipes keyed by product id.
    pub async fn index(&self) -> DbResult<HashMap<String, Recipe>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .map(|r| (r.product_id.clone(), r))
            .collect())
    }

    /// Inserts a new recipe with its ingredients.
    ///
    /// A second recipe for the same product fails with a unique violation
    /// on `recipes.product_id`.
    pub async fn insert(conn: &mut SqliteConnection, recipe: &Recipe) -> DbResult<()> {
        debug!(product_id = %recipe.product_id, "Inserting recipe");

        let now = Utc::now();
        sqlx::query("INSERT INTO recipes (product_id, created_at, updated_at) VALUES (?1, ?2, ?2)")
            .bind(&recipe.product_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;

        Self::insert_ingredients(conn, recipe).await
    }

    /// Replaces the ingredients of an existing recipe.
    ///
    /// ## Returns
    /// `Ok(false)` if the product has no recipe.
    pub async fn replace(conn: &mut SqliteConnection, recipe: &Recipe) -> DbResult<bool> {
        debug!(product_id = %recipe.product_id, "Replacing recipe");

        let result = sqlx::query("UPDATE recipes SET updated_at = ?2 WHERE product_id = ?1")
            .bind(&recipe.product_id)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM recipe_ingredients WHERE product_id = ?1")
            .bind(&recipe.product_id)
            .execute(&mut *conn)
            .await?;

        Self::insert_ingredients(conn, recipe).await?;
        Ok(true)
    }

    async fn insert_ingredients(conn: &mut SqliteConnection, recipe: &Recipe) -> DbResult<()> {
        for (position, ingredient) in recipe.ingredients.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO recipe_ingredients (product_id, position, inventory_item_id, qty_per_unit)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(&recipe.product_id)
            .bind(position as i64)
            .bind(&ingredient.inventory_item_id)
            .bind(ingredient.qty_per_unit)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Deletes a recipe. Returns `false` if there was none.
    pub async fn delete(&self, product_id: &str) -> DbResult<bool> {
        debug!(product_id = %product_id, "Deleting recipe");

        let result = sqlx::query("DELETE FROM recipes WHERE product_id = ?1")
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// First product whose recipe uses the inventory item, if any.
    pub async fn first_product_using_item(&self, inventory_item_id: &str) -> DbResult<Option<String>> {
        let product_id: Option<String> = sqlx::query_scalar(
            r#"
            SELECT product_id FROM recipe_ingredients
            WHERE inventory_item_id = ?1
            ORDER BY product_id
            LIMIT 1
            "#,
        )
        .bind(inventory_item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product_id)
    }
}
