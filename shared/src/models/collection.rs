//! Collection (supplier pickup) models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownVariant;
use crate::pricing::ProductPricing;

/// Collection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Pending,
    Collected,
    Verified,
    Rejected,
    QualityRejected,
    Failed,
    Cancelled,
}

/// Actions on a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionAction {
    Collect,
    Fail,
    Verify,
    Reject,
    QualityReject,
    Cancel,
}

const COLLECTION_TRANSITIONS: &[(CollectionStatus, CollectionAction, CollectionStatus)] = &[
    (CollectionStatus::Pending, CollectionAction::Collect, CollectionStatus::Collected),
    (CollectionStatus::Pending, CollectionAction::Fail, CollectionStatus::Failed),
    (CollectionStatus::Pending, CollectionAction::Cancel, CollectionStatus::Cancelled),
    (CollectionStatus::Collected, CollectionAction::Verify, CollectionStatus::Verified),
    (CollectionStatus::Collected, CollectionAction::Reject, CollectionStatus::Rejected),
    (CollectionStatus::Collected, CollectionAction::QualityReject, CollectionStatus::QualityRejected),
    (CollectionStatus::Collected, CollectionAction::Cancel, CollectionStatus::Cancelled),
];

impl CollectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionStatus::Pending => "pending",
            CollectionStatus::Collected => "collected",
            CollectionStatus::Verified => "verified",
            CollectionStatus::Rejected => "rejected",
            CollectionStatus::QualityRejected => "quality_rejected",
            CollectionStatus::Failed => "failed",
            CollectionStatus::Cancelled => "cancelled",
        }
    }

    pub fn apply(self, action: CollectionAction) -> Option<CollectionStatus> {
        COLLECTION_TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
            .map(|(_, _, to)| *to)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CollectionStatus::Pending | CollectionStatus::Collected)
    }
}

impl std::fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CollectionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CollectionStatus::Pending),
            "collected" => Ok(CollectionStatus::Collected),
            "verified" => Ok(CollectionStatus::Verified),
            "rejected" => Ok(CollectionStatus::Rejected),
            "quality_rejected" => Ok(CollectionStatus::QualityRejected),
            "failed" => Ok(CollectionStatus::Failed),
            "cancelled" => Ok(CollectionStatus::Cancelled),
            other => Err(UnknownVariant::new("collection status", other)),
        }
    }
}

impl CollectionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionAction::Collect => "collect",
            CollectionAction::Fail => "fail",
            CollectionAction::Verify => "verify",
            CollectionAction::Reject => "reject",
            CollectionAction::QualityReject => "quality_reject",
            CollectionAction::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for CollectionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product line of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionProduct {
    pub po_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub expected_quantity: Decimal,
    pub unit: String,
    pub agreed_price_per_unit: Decimal,
}

/// How the verified goods were linked to a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageMode {
    Existing,
    New,
}

/// Admin verification captured when a collection is verified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminVerification {
    pub verified_quantity: Decimal,
    pub quality_notes: Option<String>,
    pub linkage: LinkageMode,
    pub product_id: Uuid,
    /// Pricing configuration applied with the delivery, if any
    pub pricing: Option<ProductPricing>,
    pub payment_amount: Decimal,
    pub verified_by: Uuid,
    pub verified_at: DateTime<Utc>,
}

/// Rejection details of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRejection {
    pub reason: String,
    pub notes: Option<String>,
    pub quality_issue: bool,
    pub rejected_by: Uuid,
    pub rejected_at: DateTime<Utc>,
}

/// A physical pickup of goods from a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionEvent {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub deliverer_id: Option<Uuid>,
    pub status: CollectionStatus,
    pub collection_products: Vec<CollectionProduct>,
    pub admin_verification: Option<AdminVerification>,
    pub rejection: Option<CollectionRejection>,
    pub failure_reason: Option<String>,
    pub collected_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl CollectionEvent {
    /// The line a verification applies to
    pub fn primary_line(&self) -> Option<&CollectionProduct> {
        self.collection_products.first()
    }
}

/// Fields of a collection about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewCollectionEvent {
    pub supplier_id: Uuid,
    pub deliverer_id: Option<Uuid>,
    pub collection_products: Vec<CollectionProduct>,
    pub created_by: Uuid,
}

/// Changes written by a collection transition; `None` leaves a field as is
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionChanges {
    pub status: CollectionStatus,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
    pub admin_verification: Option<AdminVerification>,
    pub rejection: Option<CollectionRejection>,
    pub failure_reason: Option<String>,
    pub collected_at: Option<DateTime<Utc>>,
}

impl CollectionChanges {
    pub fn new(status: CollectionStatus, actor_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            status,
            actor_id,
            at,
            admin_verification: None,
            rejection: None,
            failure_reason: None,
            collected_at: None,
        }
    }

    pub fn apply_to(&self, collection: &mut CollectionEvent) {
        collection.status = self.status;
        collection.updated_by = Some(self.actor_id);
        collection.updated_at = self.at;

        if let Some(verification) = &self.admin_verification {
            collection.admin_verification = Some(verification.clone());
        }
        if let Some(rejection) = &self.rejection {
            collection.rejection = Some(rejection.clone());
        }
        if let Some(reason) = &self.failure_reason {
            collection.failure_reason = Some(reason.clone());
        }
        if let Some(at) = self.collected_at {
            collection.collected_at = Some(at);
        }
    }
}
