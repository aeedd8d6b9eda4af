//! Kitchen ingredients and their stock movements.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::Authenticated;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use poli_core::{Ingredient, InventoryMovement, NewIngredient, NewInventoryMovement};
use poli_db::AuditAction;

/// Movements returned when no limit is given.
const DEFAULT_MOVEMENT_LIMIT: u32 = 50;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngredientQuery {
    #[serde(default)]
    low_stock: bool,
}

#[derive(Debug, Default, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MovementApplied {
    ingredient: Ingredient,
    movement: InventoryMovement,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory", get(list).post(create))
        .route("/api/inventory/movements", post(apply_movement))
        .route("/api/inventory/{id}/movements", get(movements))
}

async fn list(
    State(state): State<AppState>,
    _caller: Authenticated,
    query: Result<Query<IngredientQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Ingredient>>> {
    let Query(query) = query?;
    let ingredients = if query.low_stock {
        state.db.ingredients().low_stock().await?
    } else {
        state.db.ingredients().list().await?
    };
    Ok(Json(ingredients))
}

async fn create(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<NewIngredient>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Ingredient>)> {
    let Json(new) = body?;
    let ingredient = state.db.ingredients().create(new).await?;

    state
        .audit(
            &caller,
            AuditAction::CreateIngredient,
            "ingredients",
            &ingredient.id,
            None,
            Some(&ingredient),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn apply_movement(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<NewInventoryMovement>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MovementApplied>)> {
    let Json(new) = body?;
    let (ingredient, movement) = state
        .db
        .ingredients()
        .apply_movement(&caller.user_id, new)
        .await?;

    state
        .audit(
            &caller,
            AuditAction::InventoryMovement,
            "inventory_movements",
            &movement.id,
            None,
            Some(&movement),
        )
        .await;

    Ok((StatusCode::CREATED, Json(MovementApplied { ingredient, movement })))
}

async fn movements(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<InventoryMovement>>> {
    let Query(query) = query?;

    if state.db.ingredients().get(&id).await?.is_none() {
        return Err(ApiError::not_found("Ingredient", &id));
    }

    let limit = query.limit.unwrap_or(DEFAULT_MOVEMENT_LIMIT).clamp(1, 500);
    Ok(Json(state.db.ingredients().movements(&id, limit).await?))
}
