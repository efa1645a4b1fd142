//! Product pricing and stock HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{PricingEdit, ProductPricingView, ProductSupplierLink, StockTransaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentActor;
use crate::services::pricing::PricingEditOutcome;
use crate::AppState;

pub async fn get_product_pricing(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductPricingView>> {
    Ok(Json(state.pricing().get(product_id).await?))
}

/// Apply a single spreadsheet edit to a product's pricing
pub async fn edit_product_pricing(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(product_id): Path<Uuid>,
    Json(edit): Json<PricingEdit>,
) -> AppResult<Json<PricingEditOutcome>> {
    tracing::debug!(actor_id = %actor.id, product_id = %product_id, "Pricing edit");
    Ok(Json(state.pricing().apply_edit(product_id, edit).await?))
}

pub async fn get_stock_transactions(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    Ok(Json(state.stock_ledger().history(product_id).await?))
}

pub async fn get_product_suppliers(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProductSupplierLink>>> {
    if state.store.find_product(product_id).await?.is_none() {
        return Err(AppError::not_found("Product", product_id));
    }
    Ok(Json(state.store.list_product_suppliers(product_id).await?))
}
