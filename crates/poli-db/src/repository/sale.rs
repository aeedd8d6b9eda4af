//! # Sale Repository
//!
//! Lookups over committed sales, plus the inserts the ledger engine runs
//! inside its sale transaction.
//!
//! ## Order Numbers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              next_order_sequence (inside the sale tx)                   │
//! │                                                                         │
//! │  daily_order_counters                                                  │
//! │  ┌──────────────┬───────────────┐                                      │
//! │  │ business_day │ last_sequence │   INSERT ... VALUES (day, 1)         │
//! │  ├──────────────┼───────────────┤   ON CONFLICT DO UPDATE              │
//! │  │ 2025-03-14   │      41       │     SET last_sequence + 1            │
//! │  │ 2025-03-15   │       7  ◄────┼── RETURNING 8 → "15032025-008"       │
//! │  └──────────────┴───────────────┘                                      │
//! │                                                                         │
//! │  The counter row rolls back with the sale, so numbers have no gaps     │
//! │  and are never handed out twice.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::error::DbResult;
use poli_core::{Page, PageRequest, Sale, SaleItem, SaleItemAddon, SaleLine, SaleWithItems};

const SALE_COLUMNS: &str = "id, order_number, client_id, user_id, cash_register_id, session_id, \
     total, discount, delivery_cost, payment_method, order_type, business_day, created_at";

const ITEM_COLUMNS: &str = "id, sale_id, product_id, product_name, quantity, price, subtotal, \
     second_flavor_product_id, second_flavor_product_name, comments, other_ingredient, line_number";

/// Filters for sale listings. Bounds are `[from, to)`.
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Sales matching `filter`, newest first. Lines are not loaded.
    pub async fn list(&self, filter: &SaleFilter, page: PageRequest) -> DbResult<Page<Sale>> {
        let condition = r#"
            WHERE (?1 IS NULL OR created_at >= ?1)
              AND (?2 IS NULL OR created_at < ?2)
              AND (?3 IS NULL OR client_id = ?3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM sales {condition}"))
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.client_id)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales {condition} ORDER BY created_at DESC, rowid DESC LIMIT ?4 OFFSET ?5"
        );
        let items = sqlx::query_as::<_, Sale>(&sql)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.client_id)
            .bind(page.limit as i64)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, total, page))
    }

    /// A sale with its lines and addons.
    pub async fn get(&self, id: &str) -> DbResult<Option<SaleWithItems>> {
        self.find_by("id", id).await
    }

    /// A sale by its `ddMMyyyy-NNN` order number.
    pub async fn get_by_order_number(&self, order_number: &str) -> DbResult<Option<SaleWithItems>> {
        self.find_by("order_number", order_number).await
    }

    /// Number of sales booked on a business day (`YYYY-MM-DD`).
    pub async fn count_for_day(&self, business_day: &str) -> DbResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE business_day = ?1")
            .bind(business_day)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by(&self, column: &'static str, value: &str) -> DbResult<Option<SaleWithItems>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE {column} = ?1");
        let Some(sale) = sqlx::query_as::<_, Sale>(&sql)
            .bind(value)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let items = load_lines(&mut conn, &sale.id).await?;
        Ok(Some(SaleWithItems { sale, items }))
    }
}

/// Lines of a sale in line order, each with its addons.
async fn load_lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY line_number");
    let items = sqlx::query_as::<_, SaleItem>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;

    let addons = sqlx::query_as::<_, SaleItemAddon>(
        r#"
        SELECT a.id, a.sale_item_id, a.addon_id, a.addon_name, a.quantity, a.price
        FROM sale_item_addons a
        JOIN sale_items i ON i.id = a.sale_item_id
        WHERE i.sale_id = ?1
        ORDER BY a.rowid
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_item: HashMap<String, Vec<SaleItemAddon>> = HashMap::new();
    for addon in addons {
        by_item.entry(addon.sale_item_id.clone()).or_default().push(addon);
    }

    Ok(items
        .into_iter()
        .map(|item| {
            let addons = by_item.remove(&item.id).unwrap_or_default();
            SaleLine { item, addons }
        })
        .collect())
}

// =============================================================================
// Transaction-Scoped Operations
// =============================================================================

/// Allocates the next order sequence of a business day.
pub async fn next_order_sequence(conn: &mut SqliteConnection, business_day: &str) -> DbResult<i64> {
    let sequence = sqlx::query_scalar(
        r#"
        INSERT INTO daily_order_counters (business_day, last_sequence)
        VALUES (?1, 1)
        ON CONFLICT(business_day) DO UPDATE SET last_sequence = last_sequence + 1
        RETURNING last_sequence
        "#,
    )
    .bind(business_day)
    .fetch_one(&mut *conn)
    .await?;
    Ok(sequence)
}

pub async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, order_number, client_id, user_id, cash_register_id, session_id,
            total, discount, delivery_cost, payment_method, order_type, business_day, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.order_number)
    .bind(&sale.client_id)
    .bind(&sale.user_id)
    .bind(&sale.cash_register_id)
    .bind(&sale.session_id)
    .bind(sale.total)
    .bind(sale.discount)
    .bind(sale.delivery_cost)
    .bind(sale.payment_method)
    .bind(sale.order_type)
    .bind(&sale.business_day)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, product_name, quantity, price, subtotal,
            second_flavor_product_id, second_flavor_product_name, comments,
            other_ingredient, line_number
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.price)
    .bind(item.subtotal)
    .bind(&item.second_flavor_product_id)
    .bind(&item.second_flavor_product_name)
    .bind(&item.comments)
    .bind(&item.other_ingredient)
    .bind(item.line_number)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn insert_addon(conn: &mut SqliteConnection, addon: &SaleItemAddon) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_item_addons (id, sale_item_id, addon_id, addon_name, quantity, price)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&addon.id)
    .bind(&addon.sale_item_id)
    .bind(&addon.addon_id)
    .bind(&addon.addon_name)
    .bind(addon.quantity)
    .bind(addon.price)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
