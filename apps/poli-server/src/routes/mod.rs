//! # HTTP Routes
//!
//! ```text
//! /api
//!  ├── health
//!  ├── cash-register            GET (ADMIN/SYSADMIN)
//!  │    ├── summary             GET
//!  │    ├── open                POST { initialAmount }
//!  │    ├── extract             POST { amount, description? }
//!  │    └── close               POST { finalAmount }
//!  ├── cash-tickets             GET, /{id}
//!  ├── sales                    GET, POST
//!  │    ├── count-today         GET
//!  │    ├── {id}                GET
//!  │    └── order/{orderNumber} GET
//!  ├── products                 GET, POST, /{id} GET PUT DELETE
//!  ├── product-addons           GET, POST
//!  ├── clients                  GET, POST, /{id}
//!  ├── users                    GET, POST (SYSADMIN)
//!  ├── inventory                GET, POST
//!  │    ├── movements           POST
//!  │    └── {id}/movements      GET
//!  ├── reports/cash, reports/sales, reports/inventory
//!  ├── dashboard/stats          GET
//!  └── config                   GET, PUT (SYSADMIN)
//!       └── backup              POST (SYSADMIN)
//! ```

mod cash_register;
mod catalog;
mod clients;
mod config;
mod health;
mod inventory;
mod reports;
mod sales;
mod users;


use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::state::AppState;
use poli_core::order_number::business_day_bounds;
use poli_core::PageRequest;

/// All `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(cash_register::routes())
        .merge(sales::routes())
        .merge(catalog::routes())
        .merge(clients::routes())
        .merge(users::routes())
        .merge(inventory::routes())
        .merge(reports::routes())
        .merge(config::routes())
}

// =============================================================================
// Shared Query Parameters
// =============================================================================

/// `?page=&limit=`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// `?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD`, both business days, inclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRangeQuery {
    /// UTC bounds `[from, to)`; a missing side defaults to today.
    pub fn bounds(&self, state: &AppState) -> (DateTime<Utc>, DateTime<Utc>) {
        let offset = state.ledger.config().business_offset;
        let today = state.ledger.business_day();

        let start = self.start_date.unwrap_or(today);
        let end = self.end_date.unwrap_or(today).max(start);

        (business_day_bounds(start, offset).0, business_day_bounds(end, offset).1)
    }

    /// Bounds only for the sides that were given.
    pub fn optional_bounds(&self, state: &AppState) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        let offset = state.ledger.config().business_offset;
        (
            self.start_date.map(|d| business_day_bounds(d, offset).0),
            self.end_date.map(|d| business_day_bounds(d, offset).1),
        )
    }
}
