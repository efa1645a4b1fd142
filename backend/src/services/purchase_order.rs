//! Purchase order lifecycle service
//!
//! All status changes go through one table-driven transition routine that
//! writes with a conditional update keyed on the status it read.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    generate_po_number, purchase_order_total, validate_advance_amount, validate_collection_window, validate_notes,
    validate_order_quantity, validate_reason, validate_unit_code, validate_unit_price, Actor,
    AdvancePaymentTerms, CollectionWindow, NewPurchaseOrder, PurchaseOrder, PurchaseOrderAction,
    PurchaseOrderChanges, PurchaseOrderStatus, PurchaseOrderStatusChange,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::config::PurchasingConfig;
use crate::error::{AppError, AppResult};
use crate::store::Store;

/// Upper bound on conditional-update attempts while walking towards `verified`
const MAX_SYNC_ATTEMPTS: usize = 6;

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    store: Arc<dyn Store>,
    purchasing: PurchasingConfig,
}

/// Input for raising a draft purchase order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub pickup_date: Option<NaiveDate>,
    pub deliverer_id: Option<Uuid>,
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 16))]
    pub unit: String,
    pub unit_price: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Terms supplied when approving an order; absent terms keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalTerms {
    pub collection_window: Option<CollectionWindow>,
    pub advance_payment_terms: Option<AdvancePaymentTerms>,
}

impl ApprovalTerms {
    fn validate(&self) -> AppResult<()> {
        if let Some(window) = &self.collection_window {
            validate_collection_window(window)
                .map_err(|m| AppError::validation("collection_window", m))?;
        }
        if let Some(terms) = &self.advance_payment_terms {
            validate_advance_amount(terms.amount)
                .map_err(|m| AppError::validation("advance_payment_terms.amount", m))?;
            validate_notes(terms.notes.as_deref())
                .map_err(|m| AppError::validation("advance_payment_terms.notes", m))?;
        }
        Ok(())
    }
}

impl PurchaseOrderService {
    pub fn new(store: Arc<dyn Store>, purchasing: PurchasingConfig) -> Self {
        Self { store, purchasing }
    }

    /// Raise a draft purchase order with a fresh sequential number
    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id, product_id = %input.product_id))]
    pub async fn create_draft(
        &self,
        input: CreatePurchaseOrderInput,
        actor: &Actor,
    ) -> AppResult<PurchaseOrder> {
        input.validate()?;
        validate_order_quantity(input.quantity).map_err(|m| AppError::validation("quantity", m))?;
        validate_unit_price(input.unit_price).map_err(|m| AppError::validation("unit_price", m))?;
        validate_unit_code(&input.unit).map_err(|m| AppError::validation("unit", m))?;
        validate_notes(input.notes.as_deref()).map_err(|m| AppError::validation("notes", m))?;
        purchase_order_total(input.quantity, input.unit_price)?;

        if self.store.find_product(input.product_id).await?.is_none() {
            return Err(AppError::not_found("Product", input.product_id));
        }

        let sequence = self
            .store
            .next_sequence_value(&self.purchasing.po_sequence)
            .await?;
        let po_number = generate_po_number(
            &self.purchasing.po_number_prefix,
            Utc::now().year(),
            sequence,
        );

        let po = self
            .store
            .insert_purchase_order(NewPurchaseOrder {
                po_number,
                supplier_id: input.supplier_id,
                product_id: input.product_id,
                quantity: input.quantity,
                unit: input.unit.trim().to_string(),
                unit_price: input.unit_price,
                assigned_deliverer_id: input.deliverer_id,
                pickup_date: input.pickup_date,
                notes: input.notes,
                created_by: actor.id,
            })
            .await?;

        tracing::info!(po_id = %po.id, po_number = %po.po_number, "Created draft purchase order");
        Ok(po)
    }

    /// Get a purchase order by ID
    pub async fn get(&self, po_id: Uuid) -> AppResult<PurchaseOrder> {
        self.store
            .find_purchase_order(po_id)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order", po_id))
    }

    /// Approve a draft, merging the supplied terms over the stored ones
    #[instrument(skip(self, actor, terms), fields(actor_id = %actor.id))]
    pub async fn approve(
        &self,
        po_id: Uuid,
        actor: &Actor,
        terms: ApprovalTerms,
    ) -> AppResult<PurchaseOrder> {
        terms.validate()?;

        let mut changes = PurchaseOrderChanges::new(PurchaseOrderStatus::Ordered, actor.id, Utc::now());
        changes.approved = true;
        changes.collection_window = terms.collection_window;
        changes.advance_payment_terms = terms.advance_payment_terms;

        self.transition(po_id, PurchaseOrderAction::Approve, changes, None)
            .await
    }

    /// Reject a draft; the order ends cancelled with the reason recorded
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn reject(&self, po_id: Uuid, actor: &Actor, reason: &str) -> AppResult<PurchaseOrder> {
        validate_reason(reason).map_err(|m| AppError::validation("reason", m))?;
        validate_notes(Some(reason)).map_err(|m| AppError::validation("reason", m))?;

        let reason = reason.trim().to_string();
        let mut changes = PurchaseOrderChanges::new(PurchaseOrderStatus::Cancelled, actor.id, Utc::now());
        changes.rejection_reason = Some(reason.clone());

        self.transition(po_id, PurchaseOrderAction::Reject, changes, Some(reason))
            .await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_in_transit(&self, po_id: Uuid, actor: &Actor) -> AppResult<PurchaseOrder> {
        let changes = PurchaseOrderChanges::new(PurchaseOrderStatus::InTransit, actor.id, Utc::now());
        self.transition(po_id, PurchaseOrderAction::Dispatch, changes, None)
            .await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_delivered(&self, po_id: Uuid, actor: &Actor) -> AppResult<PurchaseOrder> {
        let changes = PurchaseOrderChanges::new(PurchaseOrderStatus::Delivered, actor.id, Utc::now());
        self.transition(po_id, PurchaseOrderAction::Deliver, changes, None)
            .await
    }

    /// Cancel a non-terminal order (admin only)
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn cancel(&self, po_id: Uuid, actor: &Actor, reason: &str) -> AppResult<PurchaseOrder> {
        if !actor.is_admin() {
            return Err(AppError::InsufficientPermissions);
        }
        validate_reason(reason).map_err(|m| AppError::validation("reason", m))?;
        validate_notes(Some(reason)).map_err(|m| AppError::validation("reason", m))?;

        let reason = reason.trim().to_string();
        let mut changes = PurchaseOrderChanges::new(PurchaseOrderStatus::Cancelled, actor.id, Utc::now());
        changes.cancellation_reason = Some(reason.clone());

        self.transition(po_id, PurchaseOrderAction::Cancel, changes, Some(reason))
            .await
    }

    /// Status changes of an order, oldest first
    pub async fn status_history(&self, po_id: Uuid) -> AppResult<Vec<PurchaseOrderStatusChange>> {
        self.get(po_id).await?;
        self.store.list_status_changes(po_id).await
    }

    /// Walk an order along the fulfilment path until it is verified.
    ///
    /// Only legal hops are taken, each with its own conditional update. An
    /// order that is already verified is returned as is.
    #[instrument(skip(self))]
    pub async fn advance_to_verified(&self, po_id: Uuid, actor_id: Uuid) -> AppResult<PurchaseOrder> {
        let note = Some("Collection verified".to_string());

        for _ in 0..MAX_SYNC_ATTEMPTS {
            let po = self.get(po_id).await?;
            if po.status == PurchaseOrderStatus::Verified {
                return Ok(po);
            }

            let (_, next) = po.status.next_towards_verified().ok_or_else(|| {
                AppError::invalid_transition("purchase order", po.status, PurchaseOrderStatus::Verified)
            })?;

            let changes = PurchaseOrderChanges::new(next, actor_id, Utc::now());
            match self
                .store
                .update_purchase_order_if_status(po_id, po.status, changes)
                .await
            {
                Ok(updated) => {
                    self.record_change(&updated, po.status, actor_id, note.clone())
                        .await;
                    if updated.status == PurchaseOrderStatus::Verified {
                        return Ok(updated);
                    }
                }
                // Someone else moved it; re-read and continue from there
                Err(AppError::Conflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AppError::conflict(
            "purchase_order",
            format!("purchase order {} kept changing while being verified", po_id),
        ))
    }

    /// Apply `action` with a conditional update on the status just read.
    ///
    /// One conflict is retried against a fresh read; a second is returned.
    async fn transition(
        &self,
        po_id: Uuid,
        action: PurchaseOrderAction,
        mut changes: PurchaseOrderChanges,
        note: Option<String>,
    ) -> AppResult<PurchaseOrder> {
        let mut retried = false;

        loop {
            let current = self.get(po_id).await?;
            if current.status.apply(action) != Some(changes.status) {
                return Err(AppError::invalid_transition(
                    "purchase order",
                    current.status,
                    changes.status,
                ));
            }

            changes.at = Utc::now();
            match self
                .store
                .update_purchase_order_if_status(po_id, current.status, changes.clone())
                .await
            {
                Ok(updated) => {
                    self.record_change(&updated, current.status, changes.actor_id, note)
                        .await;
                    tracing::info!(
                        po_id = %po_id,
                        from = %current.status,
                        to = %updated.status,
                        "Purchase order {}",
                        action
                    );
                    return Ok(updated);
                }
                Err(AppError::Conflict { .. }) if !retried => {
                    tracing::debug!(po_id = %po_id, action = %action, "Conflict on purchase order, retrying");
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn record_change(
        &self,
        po: &PurchaseOrder,
        from_status: PurchaseOrderStatus,
        actor_id: Uuid,
        note: Option<String>,
    ) {
        let change = PurchaseOrderStatusChange {
            po_id: po.id,
            from_status,
            to_status: po.status,
            actor_id,
            note,
            created_at: po.updated_at,
        };
        if let Err(e) = self.store.append_status_change(change).await {
            tracing::warn!(po_id = %po.id, error = %e, "Failed to append status change");
        }
    }
}
