//! # Catalog Service
//!
//! Products and inventory item metadata. Stock and unit cost are set once at
//! creation; afterwards only the ledger writes them.
//!
//! ## Edit Guards
//! ```text
//! update_product / delete_product
//!      │
//!      ├── referenced by a transaction line? ──► ProductInUse
//!      └── otherwise write (recipe cascades on delete)
//!
//! delete_inventory_item
//!      │
//!      ├── ingredient of some recipe? ──► InventoryItemInUse
//!      └── otherwise delete (restock history is kept)
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use tally_core::validation::{
    validate_name, validate_non_negative_amount, validate_non_negative_quantity,
};
use tally_core::{CoreError, InventoryItem, Money, Product, StockUnit};

use crate::error::{DbError, LedgerError, ServiceResult};
use crate::pool::Database;
use crate::repository::inventory::generate_inventory_item_id;
use crate::repository::product::generate_product_id;

/// Fields of a product to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub category: String,
    pub image: Option<String>,
}

/// Replacement fields of an existing product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: String,
    pub price: Money,
    pub category: String,
    pub image: Option<String>,
}

/// Fields of an inventory item to create, including its opening stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub unit: StockUnit,
    pub stock: i64,
    pub unit_cost: Money,
    pub min_stock: i64,
}

/// Metadata of an inventory item. Stock and cost are not editable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemUpdate {
    pub name: String,
    pub unit: StockUnit,
    pub min_stock: i64,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    // =========================================================================
    // Products
    // =========================================================================

    pub async fn create_product(&self, new: NewProduct) -> ServiceResult<Product> {
        validate_product(&new.name, new.price, &new.category)?;

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            name: new.name.trim().to_string(),
            price: new.price,
            category: new.category.trim().to_string(),
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        self.db.products().insert(&product).await?;

        info!(id = %product.id, name = %product.name, price = %product.price, "Product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.db.products().list().await?)
    }

    /// Rewrites a product that no recorded sale references.
    pub async fn update_product(&self, id: &str, update: ProductUpdate) -> ServiceResult<Product> {
        validate_product(&update.name, update.price, &update.category)?;

        let mut product = self.get_product(id).await?;
        let products = self.db.products();
        if products.is_referenced(id).await? {
            return Err(CoreError::ProductInUse(id.to_string()).into());
        }

        product.name = update.name.trim().to_string();
        product.price = update.price;
        product.category = update.category.trim().to_string();
        product.image = update.image;
        products.update(&product).await?;

        info!(id = %id, price = %product.price, "Product updated");
        self.get_product(id).await
    }

    /// Deletes a product that no recorded sale references, with its recipe.
    pub async fn delete_product(&self, id: &str) -> ServiceResult<()> {
        let products = self.db.products();
        if products.get_by_id(id).await?.is_none() {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }
        if products.is_referenced(id).await? {
            return Err(CoreError::ProductInUse(id.to_string()).into());
        }

        products.delete(id).await.map_err(|err| match err {
            DbError::NotFound { .. } => LedgerError::from(CoreError::ProductNotFound(id.to_string())),
            DbError::ForeignKeyViolation { .. } => {
                LedgerError::from(CoreError::ProductInUse(id.to_string()))
            }
            other => LedgerError::from(other),
        })?;

        info!(id = %id, "Product deleted");
        Ok(())
    }

    // =========================================================================
    // Inventory Items
    // =========================================================================

    pub async fn create_inventory_item(&self, new: NewInventoryItem) -> ServiceResult<InventoryItem> {
        validate_name("name", &new.name)?;
        validate_non_negative_quantity("stock", new.stock)?;
        validate_non_negative_amount("unit cost", new.unit_cost)?;
        validate_non_negative_quantity("min stock", new.min_stock)?;

        let now = Utc::now();
        let item = InventoryItem {
            id: generate_inventory_item_id(),
            name: new.name.trim().to_string(),
            unit: new.unit,
            stock: new.stock,
            unit_cost: new.unit_cost,
            min_stock: new.min_stock,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.inventory().insert(&item).await?;

        info!(id = %item.id, name = %item.name, stock = item.stock, "Inventory item created");
        Ok(item)
    }

    pub async fn get_inventory_item(&self, id: &str) -> ServiceResult<InventoryItem> {
        self.db
            .inventory()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::InventoryItemNotFound(id.to_string()).into())
    }

    pub async fn list_inventory_items(&self) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.db.inventory().list().await?)
    }

    /// Updates name, unit and reorder threshold.
    pub async fn update_inventory_item(
        &self,
        id: &str,
        update: InventoryItemUpdate,
    ) -> ServiceResult<InventoryItem> {
        validate_name("name", &update.name)?;
        validate_non_negative_quantity("min stock", update.min_stock)?;

        self.db
            .inventory()
            .update_metadata(id, update.name.trim(), update.unit, update.min_stock)
            .await
            .map_err(|err| match err {
                DbError::NotFound { .. } => {
                    LedgerError::from(CoreError::InventoryItemNotFound(id.to_string()))
                }
                other => LedgerError::from(other),
            })?;

        self.get_inventory_item(id).await
    }

    /// Deletes an item no recipe uses. Its restock history is kept.
    pub async fn delete_inventory_item(&self, id: &str) -> ServiceResult<()> {
        if let Some(product_id) = self.db.recipes().first_product_using_item(id).await? {
            return Err(CoreError::InventoryItemInUse {
                item_id: id.to_string(),
                product_id,
            }
            .into());
        }

        self.db.inventory().delete(id).await.map_err(|err| match err {
            DbError::NotFound { .. } => {
                LedgerError::from(CoreError::InventoryItemNotFound(id.to_string()))
            }
            other => LedgerError::from(other),
        })?;

        info!(id = %id, "Inventory item deleted");
        Ok(())
    }
}

fn validate_product(name: &str, price: Money, category: &str) -> ServiceResult<()> {
    validate_name("name", name)?;
    validate_non_negative_amount("price", price)?;
    validate_name("category", category)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
