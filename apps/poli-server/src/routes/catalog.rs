//! Products and product addons.

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
use poli_core::{NewProduct, NewProductAddon, Page, Product, ProductAddon, ProductStatus, ProductUpdate};
use poli_db::{AuditAction, ProductQuery};

#[derive(Debug, Default, Deserialize)]
struct ProductFilter {
    search: Option<String>,
    status: Option<ProductStatus>,
    category: Option<String>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(deactivate_product),
        )
        .route("/api/product-addons", get(list_addons).post(create_addon))
}

async fn list_products(
    State(state): State<AppState>,
    _caller: Authenticated,
    filter: Result<Query<ProductFilter>, QueryRejection>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Product>>> {
    let (Query(filter), Query(page)) = (filter?, page?);

    let query = ProductQuery {
        search: filter.search,
        status: filter.status,
        category: filter.category,
    };

    Ok(Json(state.db.products().list(&query, page.request()).await?))
}

async fn create_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let Json(new) = body?;
    let product = state.db.products().create(new).await?;

    state
        .audit(&caller, AuditAction::CreateProduct, "products", &product.id, None, Some(&product))
        .await;

    Ok((StatusCode::CREATED, Json(product)))
}

async fn get_product(
    State(state): State<AppState>,
    _caller: Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    state
        .db
        .products()
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product", &id))
}

async fn update_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
    body: Result<Json<ProductUpdate>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Json(changes) = body?;
    let updated = state.db.products().update(&id, changes).await?;

    state
        .audit(
            &caller,
            AuditAction::UpdateProduct,
            "products",
            &id,
            Some(&updated.before),
            Some(&updated.after),
        )
        .await;

    Ok(Json(updated.after))
}

/// Soft delete; sales keep referencing the product.
async fn deactivate_product(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    Path(id): Path<String>,
) -> ApiResult<Json<Product>> {
    let updated = state.db.products().deactivate(&id).await?;

    state
        .audit(
            &caller,
            AuditAction::DeactivateProduct,
            "products",
            &id,
            Some(&updated.before),
            Some(&updated.after),
        )
        .await;

    Ok(Json(updated.after))
}

async fn list_addons(State(state): State<AppState>, _caller: Authenticated) -> ApiResult<Json<Vec<ProductAddon>>> {
    Ok(Json(state.db.products().list_active_addons().await?))
}

async fn create_addon(
    State(state): State<AppState>,
    Authenticated(caller): Authenticated,
    body: Result<Json<NewProductAddon>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductAddon>)> {
    let Json(new) = body?;
    let addon = state.db.products().create_addon(new).await?;

    state
        .audit(
            &caller,
            AuditAction::CreateProductAddon,
            "product_addons",
            &addon.id,
            None,
            Some(&addon),
        )
        .await;

    Ok((StatusCode::CREATED, Json(addon)))
}
