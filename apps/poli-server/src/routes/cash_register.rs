//! Till endpoints. Every write goes through the ledger engine.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use super::PageQuery;
use crate::auth::Authenticated;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use poli_core::{
    CashMovement, CashRegister, CashTicket, CloseRegisterRequest, ExtractCashRequest,
    OpenRegisterRequest, Page, RegisterClosure, RegisterUpdate, SessionSummary,
};

/// Register state plus one page of its movements.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterOverview {
    cash_register: CashRegister,
    movements: Page<CashMovement>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/cash-register", get(overview))
        .route("/api/cash-register/summary", get(summary))
        .route("/api/cash-register/open", post(open))
        .route("/api/cash-register/extract", post(extract))
        .route("/api/cash-register/close", post(close))
        .route("/api/cash-tickets", get(list_tickets))
        .route("/api/cash-tickets/{id}", get(get_ticket))
}

async fn overview(
    State(state): State<AppState>,
    caller: Authenticated,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<RegisterOverview>> {
    caller.require_cash_manager()?;
    let Query(query) = query?;

    let cash_register = state.ledger.status().await?;
    let movements = state.ledger.movements(query.request()).await?;

    Ok(Json(RegisterOverview {
        cash_register,
        movements,
    }))
}

async fn summary(State(state): State<AppState>, _caller: Authenticated) -> ApiResult<Json<SessionSummary>> {
    Ok(Json(state.ledger.session_summary().await?))
}

async fn open(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<OpenRegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterUpdate>> {
    let Json(request) = body?;
    let update = state.ledger.open_register(&caller, request.initial_amount).await?;
    Ok(Json(update))
}

async fn extract(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<ExtractCashRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterUpdate>> {
    let Json(request) = body?;
    let update = state
        .ledger
        .extract_cash(&caller, request.amount, request.description)
        .await?;
    Ok(Json(update))
}

async fn close(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<CloseRegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterClosure>> {
    let Json(request) = body?;
    let closure = state.ledger.close_register(&caller, request.final_amount).await?;
    Ok(Json(closure))
}

async fn list_tickets(
    State(state): State<AppState>,
    _caller: Authenticated,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Page<CashTicket>>> {
    let Query(query) = query?;
    Ok(Json(state.db.cash_register().tickets(query.request()).await?))
}

async fn get_ticket(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<CashTicket>> {
    state
        .db
        .cash_register()
        .ticket(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Cash ticket", &id))
}
