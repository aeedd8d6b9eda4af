//! Checkout and sale lookups.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::{DateRangeQuery, PageQuery};
use crate::auth::Authenticated;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use poli_core::order_number::{business_day_key, parse_order_number};
use poli_core::{NewSale, Page, Sale, SaleWithItems};
use poli_db::SaleFilter;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientQuery {
    client_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct Count {
    count: i64,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/sales", get(list).post(create))
        .route("/api/sales/count-today", get(count_today))
        .route("/api/sales/{id}", get(get_by_id))
        .route("/api/sales/order/{order_number}", get(get_by_order_number))
}

async fn list(
    State(state): State<AppState>,
    _caller: Authenticated,
    page: Result<Query<PageQuery>, QueryRejection>,
    range: Result<Query<DateRangeQuery>, QueryRejection>,
    client: Result<Query<ClientQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Sale>>> {
    let (Query(page), Query(range), Query(client)) = (page?, range?, client?);
    let (from, to) = range.optional_bounds(&state);

    let filter = SaleFilter {
        from,
        to,
        client_id: client.client_id.filter(|id| !id.trim().is_empty()),
    };

    Ok(Json(state.db.sales().list(&filter, page.request()).await?))
}

async fn create(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<NewSale>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleWithItems>)> {
    let Json(new_sale) = body?;
    let sale = state.ledger.create_sale(&caller, new_sale).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Sales of the current business day.
async fn count_today(State(state): State<AppState>, _caller: Authenticated) -> ApiResult<Json<Count>> {
    let day = business_day_key(state.ledger.business_day());
    let count = state.db.sales().count_for_day(&day).await?;
    Ok(Json(Count { count }))
}

async fn get_by_id(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<SaleWithItems>> {
    state
        .db
        .sales()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale", &id))
}

/// Receipt verification: the order number printed on the ticket.
async fn get_by_order_number(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(order_number): Path<String>,
) -> ApiResult<Json<SaleWithItems>> {
    parse_order_number(&order_number).map_err(|e| ApiError::bad_request(e.to_string()))?;

    state
        .db
        .sales()
        .get_by_order_number(&order_number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Sale", &order_number))
}
