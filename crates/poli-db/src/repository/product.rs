//! # Product Repository
//!
//! Menu products and the addons that can be attached to sale lines.
//!
//! ## Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Stock Semantics                              │
//! │                                                                         │
//! │  stock = NULL   → not tracked (made to order: pizzas, empanadas)       │
//! │  stock = 12     → tracked (bottled drinks)                             │
//! │                                                                         │
//! │  create_sale ──► take_stock(id, qty) inside the sale transaction       │
//! │                    UPDATE ... SET stock = stock - qty                   │
//! │                    WHERE stock IS NOT NULL                              │
//! │                                                                         │
//! │  Selling past zero is allowed (the drink is physically there, the      │
//! │  count was wrong); the engine logs a warning.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::{like_pattern, Updated};
use crate::error::{DbError, DbResult, PosResult};
use poli_core::validation::{
    validate_new_product, validate_non_negative, validate_required_text,
};
use poli_core::{
    CoreError, NewProduct, NewProductAddon, Page, PageRequest, Product, ProductAddon,
    ProductStatus, ProductUpdate, ValidationError,
};

const PRODUCT_COLUMNS: &str = "id, name, description, price, category, status, stock, created_at, updated_at";

const ADDON_COLUMNS: &str = "id, name, price, is_active, created_at";

/// Filters for product listings. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// Substring of the name or category.
    pub search: Option<String>,
    pub status: Option<ProductStatus>,
    pub category: Option<String>,
}

/// Repository for products and product addons.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let page = repo.list(&ProductQuery { search: Some("muzza".into()), ..Default::default() },
///                      PageRequest::default()).await?;
/// let menu = repo.list_active().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product.
    pub async fn create(&self, new: NewProduct) -> PosResult<Product> {
        validate_new_product(&new)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: new.description,
            price: new.price,
            category: new.category.trim().to_string(),
            status: new.status,
            stock: new.stock,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, price, category, status, stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.category)
        .bind(product.status)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        info!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Gets a product by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists products matching `query`, ordered by category then name.
    pub async fn list(&self, query: &ProductQuery, page: PageRequest) -> DbResult<Page<Product>> {
        let search = query
            .search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(like_pattern);

        debug!(?search, status = ?query.status, page = page.page, "Listing products");

        let filter = r#"
            WHERE (?1 IS NULL OR name LIKE ?1 ESCAPE '\' OR category LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR category = ?3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products {filter}"))
            .bind(&search)
            .bind(query.status)
            .bind(&query.category)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {filter} ORDER BY category, name LIMIT ?4 OFFSET ?5"
        );
        let items = sqlx::query_as::<_, Product>(&sql)
            .bind(&search)
            .bind(query.status)
            .bind(&query.category)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }

    /// Active products, for the point-of-sale menu.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE status = 'ACTIVE' ORDER BY category, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies a partial update. Past sales keep their snapshotted names.
    pub async fn update(&self, id: &str, changes: ProductUpdate) -> PosResult<Updated<Product>> {
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let before = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", id))?;

        let mut after = before.clone();
        if let Some(name) = changes.name {
            validate_required_text("name", &name, 200)?;
            after.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            after.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(price) = changes.price {
            validate_non_negative("price", price)?;
            after.price = price;
        }
        if let Some(category) = changes.category {
            validate_required_text("category", &category, 100)?;
            after.category = category.trim().to_string();
        }
        if let Some(status) = changes.status {
            after.status = status;
        }
        if let Some(stock) = changes.stock {
            if stock < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: "stock".to_string(),
                }
                .into());
            }
            after.stock = Some(stock);
        }
        after.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, description = ?3, price = ?4, category = ?5,
                status = ?6, stock = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&after.name)
        .bind(&after.description)
        .bind(after.price)
        .bind(&after.category)
        .bind(after.status)
        .bind(after.stock)
        .bind(after.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        info!(product_id = %id, "Product updated");
        Ok(Updated { before, after })
    }

    /// Soft delete: the product leaves the menu but stays referenced by sales.
    pub async fn deactivate(&self, id: &str) -> PosResult<Updated<Product>> {
        self.update(
            id,
            ProductUpdate {
                status: Some(ProductStatus::Inactive),
                ..Default::default()
            },
        )
        .await
    }

    // =========================================================================
    // Addons
    // =========================================================================

    pub async fn create_addon(&self, new: NewProductAddon) -> PosResult<ProductAddon> {
        validate_required_text("name", &new.name, 100)?;
        validate_non_negative("price", new.price)?;

        let addon = ProductAddon {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            price: new.price,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO product_addons (id, name, price, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&addon.id)
        .bind(&addon.name)
        .bind(addon.price)
        .bind(addon.is_active)
        .bind(addon.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        info!(addon_id = %addon.id, name = %addon.name, "Product addon created");
        Ok(addon)
    }

    pub async fn get_addon(&self, id: &str) -> DbResult<Option<ProductAddon>> {
        let mut conn = self.pool.acquire().await?;
        fetch_addon(&mut conn, id).await
    }

    pub async fn list_active_addons(&self) -> DbResult<Vec<ProductAddon>> {
        let sql = format!("SELECT {ADDON_COLUMNS} FROM product_addons WHERE is_active = 1 ORDER BY name");
        let addons = sqlx::query_as::<_, ProductAddon>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(addons)
    }
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Reads a product on the given connection.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

/// Reads an addon on the given connection.
pub async fn fetch_addon(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ProductAddon>> {
    let sql = format!("SELECT {ADDON_COLUMNS} FROM product_addons WHERE id = ?1");
    let addon = sqlx::query_as::<_, ProductAddon>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(addon)
}

/// Decrements tracked stock by `quantity`.
///
/// Returns the stock left, or `None` when the product does not track stock.
pub async fn take_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> DbResult<Option<i64>> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock IS NOT NULL
        RETURNING stock
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(remaining)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use poli_core::{ErrorKind, Money};

    fn pizza(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            description: None,
            price: Money::new(price),
            category: "Pizzas".to_string(),
            status: ProductStatus::Active,
            stock: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_search_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.create(pizza("Muzzarella", 45_000)).await.unwrap();
        repo.create(pizza("Napolitana", 50_000)).await.unwrap();

        let query = ProductQuery {
            search: Some("muzz".to_string()),
            ..Default::default()
        };
        let page = repo.list(&query, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Muzzarella");

        let all = repo.list(&ProductQuery::default(), PageRequest::default()).await.unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.products().create(pizza("  ", 1_000)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_update_and_deactivate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = repo.create(pizza("Fugazzeta", 48_000)).await.unwrap();

        let changed = repo
            .update(
                &product.id,
                ProductUpdate {
                    price: Some(Money::new(52_000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(changed.before.price, Money::new(48_000));
        assert_eq!(changed.after.price, Money::new(52_000));

        repo.deactivate(&product.id).await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());
        let stored = repo.get(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProductStatus::Inactive);
    }

    #[tokio::test]
    async fn test_update_missing_product_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .products()
            .update("nope", ProductUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_take_stock_skips_untracked_products() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let muzza = repo.create(pizza("Muzzarella", 45_000)).await.unwrap();
        let soda = repo
            .create(NewProduct {
                category: "Bebidas".to_string(),
                stock: Some(1),
                ..pizza("Coca-Cola 1L", 12_000)
            })
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(take_stock(&mut conn, &muzza.id, 2).await.unwrap(), None);
        assert_eq!(take_stock(&mut conn, &soda.id, 2).await.unwrap(), Some(-1));
    }
}
