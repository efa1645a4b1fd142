//! Stateless pricing calculator handlers

use axum::Json;
use shared::{all_units, UnitInfo};

use crate::error::AppResult;
use crate::services::pricing::{
    self, DiscountRequest, DiscountResponse, PriceRequest, PriceResponse, RatioRequest,
    RatioResponse,
};

pub async fn calculate_ratio(Json(request): Json<RatioRequest>) -> AppResult<Json<RatioResponse>> {
    Ok(Json(pricing::ratio(&request)?))
}

pub async fn calculate_price(Json(request): Json<PriceRequest>) -> AppResult<Json<PriceResponse>> {
    Ok(Json(pricing::price(&request)?))
}

pub async fn calculate_discount(
    Json(request): Json<DiscountRequest>,
) -> AppResult<Json<DiscountResponse>> {
    Ok(Json(pricing::discount(&request)?))
}

/// The unit table, grouped by category
pub async fn list_units() -> Json<Vec<UnitInfo>> {
    Json(all_units().iter().map(UnitInfo::from).collect())
}
