//! Purchase order models and status state table

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FormulaError, FormulaResult, UnknownVariant};
use crate::pricing::round_money;

/// Purchase order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    Draft,
    Ordered,
    InTransit,
    Delivered,
    Verified,
    Cancelled,
}

/// Actions that move a purchase order between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderAction {
    Approve,
    Reject,
    Dispatch,
    Deliver,
    Verify,
    Cancel,
}

use PurchaseOrderAction as A;
use PurchaseOrderStatus as S;

/// Every permitted (from, action, to) triple. Anything else is forbidden.
const PURCHASE_ORDER_TRANSITIONS: &[(PurchaseOrderStatus, PurchaseOrderAction, PurchaseOrderStatus)] = &[
    (S::Draft, A::Approve, S::Ordered),
    (S::Draft, A::Reject, S::Cancelled),
    (S::Ordered, A::Dispatch, S::InTransit),
    (S::InTransit, A::Deliver, S::Delivered),
    (S::Delivered, A::Verify, S::Verified),
    (S::Draft, A::Cancel, S::Cancelled),
    (S::Ordered, A::Cancel, S::Cancelled),
    (S::InTransit, A::Cancel, S::Cancelled),
    (S::Delivered, A::Cancel, S::Cancelled),
];

impl PurchaseOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            S::Draft => "draft",
            S::Ordered => "ordered",
            S::InTransit => "in_transit",
            S::Delivered => "delivered",
            S::Verified => "verified",
            S::Cancelled => "cancelled",
        }
    }

    /// Target status of `action` from this status, `None` if forbidden
    pub fn apply(self, action: PurchaseOrderAction) -> Option<PurchaseOrderStatus> {
        PURCHASE_ORDER_TRANSITIONS
            .iter()
            .find(|(from, a, _)| *from == self && *a == action)
            .map(|(_, _, to)| *to)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, S::Verified | S::Cancelled)
    }

    /// Next hop towards `verified` along the normal fulfilment path
    pub fn next_towards_verified(self) -> Option<(PurchaseOrderAction, PurchaseOrderStatus)> {
        let action = match self {
            S::Ordered => A::Dispatch,
            S::InTransit => A::Deliver,
            S::Delivered => A::Verify,
            _ => return None,
        };
        self.apply(action).map(|to| (action, to))
    }
}

impl std::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PurchaseOrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(S::Draft),
            "ordered" => Ok(S::Ordered),
            "in_transit" => Ok(S::InTransit),
            "delivered" => Ok(S::Delivered),
            "verified" => Ok(S::Verified),
            "cancelled" => Ok(S::Cancelled),
            other => Err(UnknownVariant::new("purchase order status", other)),
        }
    }
}

impl PurchaseOrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            A::Approve => "approve",
            A::Reject => "reject",
            A::Dispatch => "dispatch",
            A::Deliver => "deliver",
            A::Verify => "verify",
            A::Cancel => "cancel",
        }
    }
}

impl std::fmt::Display for PurchaseOrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Window in which the supplier expects the pickup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Advance payment agreed with the supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancePaymentTerms {
    pub amount: Decimal,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// A purchase order raised with a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    /// Unique sequential number (e.g., "PO-2026-000042")
    pub po_number: String,
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub status: PurchaseOrderStatus,
    pub assigned_deliverer_id: Option<Uuid>,
    pub pickup_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub collection_window: Option<CollectionWindow>,
    pub advance_payment_terms: Option<AdvancePaymentTerms>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub cancelled_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a purchase order about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchaseOrder {
    pub po_number: String,
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub assigned_deliverer_id: Option<Uuid>,
    pub pickup_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

impl NewPurchaseOrder {
    pub fn total_amount(&self) -> FormulaResult<Decimal> {
        purchase_order_total(self.quantity, self.unit_price)
    }
}

/// Changes written by a status transition
///
/// `None` fields are left untouched; a transition never clears a field.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseOrderChanges {
    pub status: PurchaseOrderStatus,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
    pub approved: bool,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub collection_window: Option<CollectionWindow>,
    pub advance_payment_terms: Option<AdvancePaymentTerms>,
}

impl PurchaseOrderChanges {
    pub fn new(status: PurchaseOrderStatus, actor_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            status,
            actor_id,
            at,
            approved: false,
            rejection_reason: None,
            cancellation_reason: None,
            collection_window: None,
            advance_payment_terms: None,
        }
    }

    /// Merge the changes into an order
    pub fn apply_to(&self, po: &mut PurchaseOrder) {
        po.status = self.status;
        po.updated_by = Some(self.actor_id);
        po.updated_at = self.at;

        if self.approved {
            po.approved_by = Some(self.actor_id);
            po.approved_at = Some(self.at);
        }
        if let Some(reason) = &self.rejection_reason {
            po.rejected_by = Some(self.actor_id);
            po.rejected_at = Some(self.at);
            po.rejection_reason = Some(reason.clone());
        }
        if let Some(reason) = &self.cancellation_reason {
            po.cancelled_by = Some(self.actor_id);
            po.cancelled_at = Some(self.at);
            po.cancellation_reason = Some(reason.clone());
        }
        if let Some(window) = &self.collection_window {
            po.collection_window = Some(window.clone());
        }
        if let Some(terms) = &self.advance_payment_terms {
            po.advance_payment_terms = Some(terms.clone());
        }
    }
}

/// Audit record of a purchase order status change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrderStatusChange {
    pub po_id: Uuid,
    pub from_status: PurchaseOrderStatus,
    pub to_status: PurchaseOrderStatus,
    pub actor_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// quantity × unit price, rounded to 2 decimals
pub fn purchase_order_total(quantity: Decimal, unit_price: Decimal) -> FormulaResult<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or(FormulaError::Overflow)
}

/// Generate a purchase order number
pub fn generate_po_number(prefix: &str, year: i32, sequence: i64) -> String {
    format!("{}-{}-{:06}", prefix, year, sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const ALL: [PurchaseOrderStatus; 6] = [
        S::Draft,
        S::Ordered,
        S::InTransit,
        S::Delivered,
        S::Verified,
        S::Cancelled,
    ];

    #[test]
    fn test_forward_path() {
        assert_eq!(S::Draft.apply(A::Approve), Some(S::Ordered));
        assert_eq!(S::Ordered.apply(A::Dispatch), Some(S::InTransit));
        assert_eq!(S::InTransit.apply(A::Deliver), Some(S::Delivered));
        assert_eq!(S::Delivered.apply(A::Verify), Some(S::Verified));
    }

    #[test]
    fn test_approve_and_reject_only_from_draft() {
        for status in ALL.into_iter().filter(|s| *s != S::Draft) {
            assert_eq!(status.apply(A::Approve), None, "{}", status);
            assert_eq!(status.apply(A::Reject), None, "{}", status);
        }
        assert_eq!(S::Draft.apply(A::Reject), Some(S::Cancelled));
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in ALL {
            let expected = (!status.is_terminal()).then_some(S::Cancelled);
            assert_eq!(status.apply(A::Cancel), expected, "{}", status);
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in [S::Verified, S::Cancelled] {
            for action in [A::Approve, A::Reject, A::Dispatch, A::Deliver, A::Verify, A::Cancel] {
                assert_eq!(status.apply(action), None);
            }
        }
    }

    #[test]
    fn test_verify_only_from_delivered() {
        for status in ALL.into_iter().filter(|s| *s != S::Delivered) {
            assert_eq!(status.apply(A::Verify), None);
        }
    }

    #[test]
    fn test_path_towards_verified() {
        let mut status = S::Ordered;
        let mut hops = 0;
        while let Some((_, next)) = status.next_towards_verified() {
            status = next;
            hops += 1;
        }
        assert_eq!(status, S::Verified);
        assert_eq!(hops, 3);
        assert_eq!(S::Draft.next_towards_verified(), None);
        assert_eq!(S::Cancelled.next_towards_verified(), None);
    }

    #[test]
    fn test_status_string_round_trip() {
        for status in ALL {
            assert_eq!(PurchaseOrderStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(PurchaseOrderStatus::from_str("shipped").is_err());
    }

    #[test]
    fn test_generate_po_number() {
        assert_eq!(generate_po_number("PO", 2026, 42), "PO-2026-000042");
        assert_eq!(generate_po_number("PO", 2026, 1_234_567), "PO-2026-1234567");
    }

    #[test]
    fn test_total_amount_rounding() {
        let total = purchase_order_total(Decimal::from_str("3.333").unwrap(), Decimal::from_str("3").unwrap());
        assert_eq!(total, Ok(Decimal::from_str("10.00").unwrap()));
    }

    #[test]
    fn test_total_amount_out_of_range() {
        let total = purchase_order_total(
            Decimal::from_str("100000000000000000000").unwrap(),
            Decimal::from_str("10000000000").unwrap(),
        );
        assert_eq!(total, Err(FormulaError::Overflow));
    }

    #[test]
    fn test_changes_merge_without_clearing() {
        let actor = Uuid::new_v4();
        let now = Utc::now();
        let window = CollectionWindow {
            start: now,
            end: now + chrono::Duration::hours(4),
        };
        let mut po = PurchaseOrder {
            id: Uuid::new_v4(),
            po_number: "PO-2026-000001".to_string(),
            supplier_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: Decimal::from(10),
            unit: "kg".to_string(),
            unit_price: Decimal::from(5),
            total_amount: Decimal::from(50),
            status: S::Draft,
            assigned_deliverer_id: None,
            pickup_date: None,
            notes: None,
            collection_window: Some(window.clone()),
            advance_payment_terms: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: actor,
            created_at: now,
            updated_by: None,
            updated_at: now,
        };

        let mut changes = PurchaseOrderChanges::new(S::Ordered, actor, now);
        changes.approved = true;
        changes.advance_payment_terms = Some(AdvancePaymentTerms {
            amount: Decimal::from(20),
            due_date: None,
            notes: None,
        });
        changes.apply_to(&mut po);

        assert_eq!(po.status, S::Ordered);
        assert_eq!(po.approved_by, Some(actor));
        assert_eq!(po.collection_window, Some(window));
        assert!(po.advance_payment_terms.is_some());
        assert!(po.rejected_by.is_none());
    }
}
