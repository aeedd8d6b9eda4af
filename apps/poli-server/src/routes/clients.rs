//! Restaurant customers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::PageQuery;
use crate::auth::Authenticated;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use poli_core::{Client, NewClient, Page};
use poli_db::AuditAction;

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    search: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/clients", get(list).post(create))
        .route("/api/clients/{id}", get(get_client))
}

async fn list(
    State(state): State<AppState>,
    _caller: Authenticated,
    search: Result<Query<SearchQuery>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Client>>> {
    let (Query(search), Query(page)) = (search?, page?);
    let clients = state
        .db
        .clients()
        .list(search.search.as_deref(), page.request())
        .await?;
    Ok(Json(clients))
}

async fn create(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<NewClient>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let Json(new) = body?;
    let client = state.db.clients().create(new).await?;

    state
        .audit(&caller, AuditAction::CreateClient, "clients", &client.id, None, Some(&client))
        .await;

    Ok((StatusCode::CREATED, Json(client)))
}

async fn get_client(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    state
        .db
        .clients()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Client", &id))
}
