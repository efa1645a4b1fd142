//! Stock transaction history models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownVariant;

/// Stock transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockTransactionType {
    /// Delivery verified into stock
    CollectionVerified,
    /// Stock a product was created with
    InitialStock,
    /// Compensation of a verification that lost a race
    VerificationReversal,
    Adjustment,
}

impl StockTransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTransactionType::CollectionVerified => "collection_verified",
            StockTransactionType::InitialStock => "initial_stock",
            StockTransactionType::VerificationReversal => "verification_reversal",
            StockTransactionType::Adjustment => "adjustment",
        }
    }
}

impl std::str::FromStr for StockTransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collection_verified" => Ok(StockTransactionType::CollectionVerified),
            "initial_stock" => Ok(StockTransactionType::InitialStock),
            "verification_reversal" => Ok(StockTransactionType::VerificationReversal),
            "adjustment" => Ok(StockTransactionType::Adjustment),
            other => Err(UnknownVariant::new("stock transaction type", other)),
        }
    }
}

/// What a ledger entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Collection,
    PurchaseOrder,
    RouteStop,
    Manual,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Collection => "collection",
            ReferenceType::PurchaseOrder => "purchase_order",
            ReferenceType::RouteStop => "route_stop",
            ReferenceType::Manual => "manual",
        }
    }
}

impl std::str::FromStr for ReferenceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collection" => Ok(ReferenceType::Collection),
            "purchase_order" => Ok(ReferenceType::PurchaseOrder),
            "route_stop" => Ok(ReferenceType::RouteStop),
            "manual" => Ok(ReferenceType::Manual),
            other => Err(UnknownVariant::new("reference type", other)),
        }
    }
}

/// A reference to the record that caused a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReference {
    pub reference_id: Uuid,
    pub reference_type: ReferenceType,
}

impl LedgerReference {
    pub fn collection(id: Uuid) -> Self {
        Self {
            reference_id: id,
            reference_type: ReferenceType::Collection,
        }
    }

    pub fn purchase_order(id: Uuid) -> Self {
        Self {
            reference_id: id,
            reference_type: ReferenceType::PurchaseOrder,
        }
    }
}

/// Immutable record of a stock change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub quantity_change: Decimal,
    pub transaction_type: StockTransactionType,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A stock transaction about to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewStockTransaction {
    pub product_id: Uuid,
    pub previous_stock: Decimal,
    pub new_stock: Decimal,
    pub transaction_type: StockTransactionType,
    pub reference: Option<LedgerReference>,
    pub performed_by: Uuid,
}

impl NewStockTransaction {
    pub fn quantity_change(&self) -> Decimal {
        self.new_stock - self.previous_stock
    }
}
