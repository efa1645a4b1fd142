//! Product ↔ supplier linkage

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link between a product and one of its suppliers, keyed by (product, supplier)
///
/// At most one link per product is primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSupplierLink {
    pub product_id: Uuid,
    pub supplier_id: Uuid,
    pub is_primary: bool,
    pub is_active: bool,
    pub assigned_deliverer_id: Option<Uuid>,
    pub pickup_date: Option<NaiveDate>,
    /// Outstanding demand/backorder quantity towards this supplier
    pub pending_demand: Decimal,
    pub demand_reset_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a link to insert when the pair is not linked yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProductSupplierLink {
    pub product_id: Uuid,
    pub supplier_id: Uuid,
    pub assigned_deliverer_id: Option<Uuid>,
    pub pickup_date: Option<NaiveDate>,
}
