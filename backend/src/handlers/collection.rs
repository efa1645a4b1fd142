//! Collection HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::CollectionEvent;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::purchase_order::ReasonInput;
use crate::middleware::CurrentActor;
use crate::services::collection::{
    CreateCollectionInput, RejectCollectionInput, VerificationOutcome, VerifyCollectionInput,
};
use crate::AppState;

/// Schedule a pickup
pub async fn create_collection(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(input): Json<CreateCollectionInput>,
) -> AppResult<(StatusCode, Json<CollectionEvent>)> {
    let collection = state.collections().create_collection(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn get_collection(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<CollectionEvent>> {
    Ok(Json(state.collections().get(collection_id).await?))
}

pub async fn mark_collection_collected(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<CollectionEvent>> {
    Ok(Json(state.collections().mark_collected(collection_id, &actor).await?))
}

pub async fn mark_collection_failed(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(collection_id): Path<Uuid>,
    Json(input): Json<ReasonInput>,
) -> AppResult<Json<CollectionEvent>> {
    let collection = state
        .collections()
        .mark_failed(collection_id, &actor, &input.reason)
        .await?;
    Ok(Json(collection))
}

pub async fn cancel_collection(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(collection_id): Path<Uuid>,
) -> AppResult<Json<CollectionEvent>> {
    Ok(Json(state.collections().cancel_collection(collection_id, &actor).await?))
}

/// Verify collected goods into stock
pub async fn verify_collection(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(collection_id): Path<Uuid>,
    Json(input): Json<VerifyCollectionInput>,
) -> AppResult<Json<VerificationOutcome>> {
    let outcome = state
        .collections()
        .verify_collection(collection_id, input, &actor)
        .await?;
    Ok(Json(outcome))
}

pub async fn reject_collection(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(collection_id): Path<Uuid>,
    Json(input): Json<RejectCollectionInput>,
) -> AppResult<Json<CollectionEvent>> {
    let collection = state
        .collections()
        .reject_collection(collection_id, input, &actor)
        .await?;
    Ok(Json(collection))
}
