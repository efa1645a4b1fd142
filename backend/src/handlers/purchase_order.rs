//! Purchase order HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{PurchaseOrder, PurchaseOrderStatusChange};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::batch_approval::{BatchApprovalItem, BatchRejectionItem, BatchResult};
use crate::services::purchase_order::{ApprovalTerms, CreatePurchaseOrderInput};
use crate::AppState;

/// Body carrying a free-text reason
#[derive(Debug, Deserialize)]
pub struct ReasonInput {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest<T> {
    pub items: Vec<T>,
}

/// Create a draft purchase order
pub async fn create_purchase_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrder>)> {
    let po = state.purchase_orders().create_draft(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(po)))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    Ok(Json(state.purchase_orders().get(po_id).await?))
}

/// Status changes of an order, oldest first
pub async fn get_purchase_order_history(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<Vec<PurchaseOrderStatusChange>>> {
    Ok(Json(state.purchase_orders().status_history(po_id).await?))
}

/// Approve a draft; terms are optional
pub async fn approve_purchase_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(po_id): Path<Uuid>,
    terms: Option<Json<ApprovalTerms>>,
) -> AppResult<Json<PurchaseOrder>> {
    let terms = terms.map(|Json(t)| t).unwrap_or_default();
    let po = state.purchase_orders().approve(po_id, &actor, terms).await?;
    Ok(Json(po))
}

pub async fn reject_purchase_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(po_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let po = state
        .purchase_orders()
        .reject(po_id, &actor, &input.reason)
        .await?;
    Ok(Json(po))
}

pub async fn mark_purchase_order_in_transit(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    Ok(Json(state.purchase_orders().mark_in_transit(po_id, &actor).await?))
}

pub async fn mark_purchase_order_delivered(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(po_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    Ok(Json(state.purchase_orders().mark_delivered(po_id, &actor).await?))
}

/// Cancel an order (admin only)
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(po_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let po = state
        .purchase_orders()
        .cancel(po_id, &actor, &input.reason)
        .await?;
    Ok(Json(po))
}

/// Approve many drafts; each item succeeds or fails on its own
pub async fn batch_approve_purchase_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<BatchRequest<BatchApprovalItem>>,
) -> Json<BatchResult<PurchaseOrder>> {
    Json(state.batch_approvals().approve_batch(request.items, &actor).await)
}

pub async fn batch_reject_purchase_orders(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<BatchRequest<BatchRejectionItem>>,
) -> Json<BatchResult<PurchaseOrder>> {
    Json(state.batch_approvals().reject_batch(request.items, &actor).await)
}
