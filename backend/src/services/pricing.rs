//! Product pricing edits and the stateless pricing calculators

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    can_convert, discounted_price, displayed_price, has_override, recompute_price,
    recompute_ratio, validate_pricing, PricingEdit, PricingIssue, Product, ProductPricingView,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::Store;

#[derive(Clone)]
pub struct ProductPricingService {
    store: Arc<dyn Store>,
}

/// Product after an edit, with the channels that could not be priced
#[derive(Debug, Clone, Serialize)]
pub struct PricingEditOutcome {
    pub product: Product,
    pub pricing: ProductPricingView,
    pub issues: Vec<PricingIssue>,
}

impl ProductPricingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Pricing of a product with its per-channel quotes
    pub async fn get(&self, product_id: Uuid) -> AppResult<ProductPricingView> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;
        Ok(product.pricing_view())
    }

    /// Apply one edit, recompute the affected channels and persist all pricing fields together
    #[instrument(skip(self))]
    pub async fn apply_edit(&self, product_id: Uuid, edit: PricingEdit) -> AppResult<PricingEditOutcome> {
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;

        let mut pricing = product.pricing;
        let issues = pricing.apply_edit(&edit);
        validate_pricing(&pricing).map_err(|m| AppError::validation("pricing", m))?;

        for issue in &issues {
            tracing::debug!(product_id = %product_id, channel = %issue.channel, "Unpriced channel: {}", issue.message);
        }

        let product = self.store.update_product_pricing(product_id, &pricing).await?;
        Ok(PricingEditOutcome {
            pricing: product.pricing_view(),
            product,
            issues,
        })
    }
}

// ============================================================================
// Stateless calculators
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RatioRequest {
    pub purchase_unit: String,
    pub selling_unit: String,
    pub selling_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatioResponse {
    pub ratio: Decimal,
    pub convertible: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRequest {
    pub purchase_price: Decimal,
    pub ratio: Decimal,
    pub multiplier: Decimal,
    pub manual_price_override: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceResponse {
    pub calculated_price: Decimal,
    pub displayed_price: Decimal,
    pub has_override: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRequest {
    pub price: Decimal,
    pub discount_percent: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountResponse {
    pub discounted_price: Decimal,
}

pub fn ratio(request: &RatioRequest) -> AppResult<RatioResponse> {
    let ratio = recompute_ratio(
        &request.purchase_unit,
        &request.selling_unit,
        request.selling_quantity,
    )?;
    Ok(RatioResponse {
        ratio,
        convertible: can_convert(&request.selling_unit, &request.purchase_unit),
    })
}

pub fn price(request: &PriceRequest) -> AppResult<PriceResponse> {
    let calculated = recompute_price(request.purchase_price, request.ratio, request.multiplier)?;
    Ok(PriceResponse {
        calculated_price: calculated,
        displayed_price: displayed_price(Some(calculated), request.manual_price_override)
            .unwrap_or(calculated),
        has_override: has_override(Some(calculated), request.manual_price_override),
    })
}

pub fn discount(request: &DiscountRequest) -> AppResult<DiscountResponse> {
    if request.discount_percent < Decimal::ZERO || request.discount_percent > Decimal::ONE_HUNDRED {
        return Err(AppError::validation(
            "discount_percent",
            "Discount must be between 0 and 100 percent",
        ));
    }
    Ok(DiscountResponse {
        discounted_price: discounted_price(request.price, request.discount_percent)?,
    })
}
