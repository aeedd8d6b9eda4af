//! # Report Repository
//!
//! Read-only aggregates over the ledger for the back office.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use super::cash_register::CashRegisterRepository;
use super::ingredient::IngredientRepository;
use crate::error::DbResult;
use poli_core::{
    CashMovementType, CashReport, DashboardStats, InventoryReport, InventoryReportMovement,
    LowStockAlert, Money, PaymentBreakdown, PaymentMethod, RegisterStatus, SalesReport, TopProduct,
};

/// How many products the sales report ranks.
pub const TOP_PRODUCTS_LIMIT: u32 = 10;

/// How many products the dashboard ranks.
pub const DASHBOARD_TOP_PRODUCTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Register state plus its movements within `[from, to)`.
    pub async fn cash_report(
        &self,
        register_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<CashReport> {
        debug!(register_id, %from, %to, "Building cash report");

        let registers = CashRegisterRepository::new(self.pool.clone());
        let register = registers.get_or_create(register_id).await?;
        let movements = registers.movements_between(register_id, from, to).await?;

        let sum_of = |kind: CashMovementType| -> Money {
            movements
                .iter()
                .filter(|m| m.movement_type == kind)
                .map(|m| m.amount)
                .sum()
        };

        Ok(CashReport {
            from,
            to,
            is_open: register.is_open,
            opening_amount: register.opening_amount,
            current_balance: register.current_balance,
            total_sales: sum_of(CashMovementType::Sale),
            total_extractions: sum_of(CashMovementType::Extraction),
            movements,
        })
    }

    /// Revenue, payment mix and best sellers within `[from, to)`.
    pub async fn sales_report(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<SalesReport> {
        debug!(%from, %to, "Building sales report");

        let by_method: Vec<(PaymentMethod, i64, i64)> = sqlx::query_as(
            r#"
            SELECT payment_method, COALESCE(SUM(total), 0), COUNT(*)
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            GROUP BY payment_method
            ORDER BY payment_method
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let by_payment_method: Vec<PaymentBreakdown> = by_method
            .into_iter()
            .map(|(payment_method, total, count)| PaymentBreakdown {
                payment_method,
                total: Money::new(total),
                count,
            })
            .collect();

        let top_products = self.top_products(from, to, TOP_PRODUCTS_LIMIT).await?;

        Ok(SalesReport {
            from,
            to,
            total_revenue: by_payment_method.iter().map(|b| b.total).sum(),
            sales_count: by_payment_method.iter().map(|b| b.count).sum(),
            by_payment_method,
            top_products,
        })
    }

    /// Stock valuation, low-stock count and inventory movements within
    /// `[from, to)`, newest first.
    pub async fn inventory_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<InventoryReport> {
        debug!(%from, %to, "Building inventory report");

        let ingredients = IngredientRepository::new(self.pool.clone()).list().await?;
        let total_value: Money = ingredients
            .iter()
            .map(|i| Money::new((i.current_stock * i.cost.amount() as f64).round() as i64))
            .sum();
        let low_stock_items = ingredients.iter().filter(|i| i.is_low_stock()).count() as i64;

        let movements = sqlx::query_as::<_, InventoryReportMovement>(
            r#"
            SELECT m.created_at AS date,
                   m.movement_type AS movement_type,
                   i.name AS ingredient_name,
                   m.quantity AS quantity,
                   m.reason AS reason,
                   m.user_id AS user_id
            FROM inventory_movements m
            JOIN ingredients i ON i.id = m.ingredient_id
            WHERE m.created_at >= ?1 AND m.created_at < ?2
            ORDER BY m.created_at DESC, m.rowid DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(InventoryReport {
            from,
            to,
            total_value,
            low_stock_items,
            movements,
        })
    }

    /// Front-page figures for `business_day`, whose UTC bounds are
    /// `[from, to)`.
    pub async fn dashboard(
        &self,
        register_id: &str,
        business_day: NaiveDate,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<DashboardStats> {
        debug!(register_id, %business_day, "Building dashboard");

        let (total, count): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total), 0), COUNT(*) FROM sales WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let new_clients_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM clients WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let register = CashRegisterRepository::new(self.pool.clone())
            .get_or_create(register_id)
            .await?;
        let top_products = self.top_products(from, to, DASHBOARD_TOP_PRODUCTS).await?;
        let low_stock_alerts = IngredientRepository::new(self.pool.clone())
            .low_stock()
            .await?
            .iter()
            .map(LowStockAlert::from)
            .collect();

        Ok(DashboardStats {
            business_day,
            total_sales_today: Money::new(total),
            sales_count_today: count,
            new_clients_today,
            cash_register_status: RegisterStatus {
                is_open: register.is_open,
                current_balance: register.current_balance,
            },
            top_products,
            low_stock_alerts,
        })
    }

    /// Best sellers by quantity within `[from, to)`.
    async fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let top_products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT i.product_id AS product_id,
                   MAX(i.product_name) AS product_name,
                   SUM(i.quantity) AS quantity,
                   SUM(i.subtotal) AS revenue
            FROM sale_items i
            JOIN sales s ON s.id = i.sale_id
            WHERE s.created_at >= ?1 AND s.created_at < ?2
            GROUP BY i.product_id
            ORDER BY quantity DESC, revenue DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(top_products)
    }
}
