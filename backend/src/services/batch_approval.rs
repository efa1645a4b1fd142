//! Batch approval and rejection of draft purchase orders
//!
//! Items run concurrently and each produces its own `Result`; one failing
//! item never stops the others.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use shared::{Actor, AdvancePaymentTerms, CollectionWindow, PurchaseOrder};
use tracing::instrument;
use uuid::Uuid;

use super::purchase_order::{ApprovalTerms, PurchaseOrderService};
use crate::error::{AppError, AppResult};

/// One order to approve, with the terms to attach
#[derive(Debug, Clone, Deserialize)]
pub struct BatchApprovalItem {
    pub po_id: Uuid,
    #[serde(default)]
    pub collection_window: Option<CollectionWindow>,
    #[serde(default)]
    pub advance_payment_terms: Option<AdvancePaymentTerms>,
}

/// One order to reject
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRejectionItem {
    pub po_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSuccess<T> {
    pub po_id: Uuid,
    pub succeeded: bool,
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub po_id: Uuid,
    pub succeeded: bool,
    pub code: String,
    pub error: String,
}

/// Aggregate outcome of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult<T> {
    pub total: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub succeeded_items: Vec<BatchSuccess<T>>,
    pub failed_items: Vec<BatchFailure>,
}

impl<T> BatchResult<T> {
    fn from_outcomes(outcomes: Vec<(Uuid, AppResult<T>)>) -> Self {
        let total = outcomes.len();
        let mut succeeded_items = Vec::new();
        let mut failed_items = Vec::new();

        for (po_id, outcome) in outcomes {
            match outcome {
                Ok(data) => succeeded_items.push(BatchSuccess {
                    po_id,
                    succeeded: true,
                    data,
                }),
                Err(err) => failed_items.push(BatchFailure {
                    po_id,
                    succeeded: false,
                    code: err.code().to_string(),
                    error: failure_message(&err),
                }),
            }
        }

        Self {
            total,
            succeeded_count: succeeded_items.len(),
            failed_count: failed_items.len(),
            succeeded_items,
            failed_items,
        }
    }
}

/// Approve and reject only apply to drafts, so a wrong state reads as such
fn failure_message(err: &AppError) -> String {
    match err {
        AppError::InvalidTransition { from, .. } => {
            format!("Purchase order is not in draft state (current status: {})", from)
        }
        other => other.to_string(),
    }
}

#[derive(Clone)]
pub struct BatchApprovalCoordinator {
    orders: PurchaseOrderService,
}

impl BatchApprovalCoordinator {
    pub fn new(orders: PurchaseOrderService) -> Self {
        Self { orders }
    }

    /// Approve every draft in the batch, attaching each item's terms
    #[instrument(skip(self, items, actor), fields(items = items.len(), actor_id = %actor.id))]
    pub async fn approve_batch(
        &self,
        items: Vec<BatchApprovalItem>,
        actor: &Actor,
    ) -> BatchResult<PurchaseOrder> {
        let outcomes = join_all(items.into_iter().map(|item| async move {
            let terms = ApprovalTerms {
                collection_window: item.collection_window,
                advance_payment_terms: item.advance_payment_terms,
            };
            let outcome = self.orders.approve(item.po_id, actor, terms).await;
            (item.po_id, outcome)
        }))
        .await;

        let result = BatchResult::from_outcomes(outcomes);
        tracing::info!(
            total = result.total,
            succeeded = result.succeeded_count,
            failed = result.failed_count,
            "Batch approval finished"
        );
        result
    }

    /// Reject every draft in the batch with its own reason
    #[instrument(skip(self, items, actor), fields(items = items.len(), actor_id = %actor.id))]
    pub async fn reject_batch(
        &self,
        items: Vec<BatchRejectionItem>,
        actor: &Actor,
    ) -> BatchResult<PurchaseOrder> {
        let outcomes = join_all(items.into_iter().map(|item| async move {
            let outcome = self.orders.reject(item.po_id, actor, &item.reason).await;
            (item.po_id, outcome)
        }))
        .await;

        let result = BatchResult::from_outcomes(outcomes);
        tracing::info!(
            total = result.total,
            succeeded = result.succeeded_count,
            failed = result.failed_count,
            "Batch rejection finished"
        );
        result
    }
}
