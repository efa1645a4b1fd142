//! Product and stock models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::{PriceQuote, ProductPricing};

/// A stocked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub pricing: ProductPricing,
    /// Only ever changed through atomic increments
    pub stock_quantity: Decimal,
    pub low_stock_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }

    pub fn pricing_view(&self) -> ProductPricingView {
        ProductPricingView {
            product_id: self.id,
            pricing: self.pricing.clone(),
            quotes: self.pricing.quotes(),
        }
    }
}

/// Fields of a product about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub sku: Option<String>,
    pub pricing: ProductPricing,
    pub initial_stock: Decimal,
    pub low_stock_threshold: Decimal,
}

/// Stock before and after an atomic increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
}

impl StockChange {
    pub fn delta(&self) -> Decimal {
        self.new_stock - self.previous_stock
    }
}

/// Pricing of a product together with its per-channel quotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPricingView {
    pub product_id: Uuid,
    pub pricing: ProductPricing,
    pub quotes: Vec<PriceQuote>,
}
