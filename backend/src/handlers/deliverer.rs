//! Deliverer cash HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use shared::DelivererCashAccount;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentActor;
use crate::services::deliverer_cash::{CashMovementInput, CashMovementOutcome};
use crate::AppState;

pub async fn get_deliverer_cash(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(deliverer_id): Path<Uuid>,
) -> AppResult<Json<DelivererCashAccount>> {
    Ok(Json(state.deliverer_cash().balance(deliverer_id).await?))
}

pub async fn replenish_deliverer_cash(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(deliverer_id): Path<Uuid>,
    Json(input): Json<CashMovementInput>,
) -> AppResult<Json<CashMovementOutcome>> {
    let outcome = state
        .deliverer_cash()
        .replenish(deliverer_id, input.amount, input.reference, actor.id)
        .await?;
    Ok(Json(outcome))
}

pub async fn disburse_deliverer_cash(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(deliverer_id): Path<Uuid>,
    Json(input): Json<CashMovementInput>,
) -> AppResult<Json<CashMovementOutcome>> {
    let outcome = state
        .deliverer_cash()
        .disburse(deliverer_id, input.amount, input.reference, actor.id)
        .await?;
    Ok(Json(outcome))
}
