//! Back-office reports and the dashboard. Dates are business days, both ends
//! inclusive.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use super::DateRangeQuery;
use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::state::AppState;
use poli_core::order_number::business_day_bounds;
use poli_core::{CashReport, DashboardStats, InventoryReport, SalesReport};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/cash", get(cash))
        .route("/api/reports/sales", get(sales))
        .route("/api/reports/inventory", get(inventory))
        .route("/api/dashboard/stats", get(dashboard))
}

async fn cash(
    State(state): State<AppState>,
    _caller: Authenticated,
    range: Result<Query<DateRangeQuery>, QueryRejection>,
) -> ApiResult<Json<CashReport>> {
    let Query(range) = range?;
    let (from, to) = range.bounds(&state);

    let report = state
        .db
        .reports()
        .cash_report(&state.ledger.config().register_id, from, to)
        .await?;
    Ok(Json(report))
}

async fn sales(
    State(state): State<AppState>,
    _caller: Authenticated,
    range: Result<Query<DateRangeQuery>, QueryRejection>,
) -> ApiResult<Json<SalesReport>> {
    let Query(range) = range?;
    let (from, to) = range.bounds(&state);
    Ok(Json(state.db.reports().sales_report(from, to).await?))
}

async fn inventory(
    State(state): State<AppState>,
    _caller: Authenticated,
    range: Result<Query<DateRangeQuery>, QueryRejection>,
) -> ApiResult<Json<InventoryReport>> {
    let Query(range) = range?;
    let (from, to) = range.bounds(&state);
    Ok(Json(state.db.reports().inventory_report(from, to).await?))
}

async fn dashboard(
    State(state): State<AppState>,
    _caller: Authenticated,
) -> ApiResult<Json<DashboardStats>> {
    let config = state.ledger.config();
    let today = state.ledger.business_day();
    let (from, to) = business_day_bounds(today, config.business_offset);

    let stats = state
        .db
        .reports()
        .dashboard(&config.register_id, today, from, to)
        .await?;
    Ok(Json(stats))
}
