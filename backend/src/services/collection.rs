//! Collection lifecycle and verification into stock
//!
//! Verifying a collection moves stock exactly once: the stock increment is
//! atomic at the store, and the collection is then moved from `collected`
//! to `verified` with a conditional update. When that update loses to a
//! concurrent verifier the increment is reversed.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    round_money, validate_collection_lines, validate_notes, validate_pricing, validate_reason,
    validate_unit_code, validate_verified_quantity, Actor, AdminVerification, CollectionAction,
    CollectionChanges, CollectionEvent, CollectionProduct, CollectionRejection, CollectionStatus,
    LedgerReference, LinkageMode, NewCollectionEvent, NewProduct, NewProductSupplierLink,
    PricingIssue, ProductPricing, StockChange,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use super::purchase_order::PurchaseOrderService;
use super::stock_ledger::ProductStockLedger;
use crate::error::{AppError, AppResult};
use crate::store::Store;

/// Collection service
#[derive(Clone)]
pub struct CollectionVerificationService {
    store: Arc<dyn Store>,
    ledger: ProductStockLedger,
    orders: PurchaseOrderService,
}

/// Input for scheduling a collection
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCollectionInput {
    pub supplier_id: Uuid,
    pub deliverer_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub lines: Vec<CollectionProduct>,
}

/// Product to create when verified goods are not stocked yet
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    pub pricing: ProductPricing,
    #[serde(default)]
    pub low_stock_threshold: Decimal,
}

/// Where the verified goods go
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProductLinkage {
    Existing {
        product_id: Uuid,
        #[serde(default)]
        update_pricing: bool,
        #[serde(default)]
        pricing: Option<ProductPricing>,
    },
    New(NewProductInput),
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyCollectionInput {
    pub verified_quantity: Decimal,
    pub quality_notes: Option<String>,
    pub linkage: ProductLinkage,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RejectCollectionInput {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub quality_issue: bool,
}

/// What happened to the purchase order named by the collection line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PoSyncOutcome {
    NotApplicable,
    Verified { po_id: Uuid, po_number: String },
    Warning { po_id: Uuid, message: String },
}

/// Result of a verification
#[derive(Debug, Clone, Serialize)]
pub struct VerificationOutcome {
    pub collection: CollectionEvent,
    pub product_id: Uuid,
    pub stock: StockChange,
    pub payment_amount: Decimal,
    /// Whether this verification created the product ↔ supplier link
    pub supplier_linked: bool,
    pub po_sync: PoSyncOutcome,
    pub pricing_issues: Vec<PricingIssue>,
    pub low_stock: bool,
}

/// Stock effect of step 2, kept for compensation
struct StockApplied {
    product_id: Uuid,
    change: StockChange,
    low_stock_threshold: Decimal,
    pricing_snapshot: ProductPricing,
    linkage: LinkageMode,
}

impl CollectionVerificationService {
    pub fn new(store: Arc<dyn Store>, ledger: ProductStockLedger, orders: PurchaseOrderService) -> Self {
        Self {
            store,
            ledger,
            orders,
        }
    }

    /// Get a collection by ID
    pub async fn get(&self, collection_id: Uuid) -> AppResult<CollectionEvent> {
        self.store
            .find_collection(collection_id)
            .await?
            .ok_or_else(|| AppError::not_found("Collection", collection_id))
    }

    /// Schedule a pickup from a supplier
    #[instrument(skip(self, input, actor), fields(supplier_id = %input.supplier_id))]
    pub async fn create_collection(
        &self,
        input: CreateCollectionInput,
        actor: &Actor,
    ) -> AppResult<CollectionEvent> {
        input.validate()?;
        validate_collection_lines(&input.lines).map_err(|m| AppError::validation("lines", m))?;
        for line in &input.lines {
            validate_unit_code(&line.unit).map_err(|m| AppError::validation("lines.unit", m))?;
        }

        let collection = self
            .store
            .insert_collection(NewCollectionEvent {
                supplier_id: input.supplier_id,
                deliverer_id: input.deliverer_id,
                collection_products: input.lines,
                created_by: actor.id,
            })
            .await?;

        tracing::info!(collection_id = %collection.id, "Scheduled collection");
        Ok(collection)
    }

    /// The deliverer picked the goods up
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_collected(&self, collection_id: Uuid, actor: &Actor) -> AppResult<CollectionEvent> {
        let now = Utc::now();
        let mut changes = CollectionChanges::new(CollectionStatus::Collected, actor.id, now);
        changes.collected_at = Some(now);
        self.transition(collection_id, CollectionAction::Collect, changes)
            .await
    }

    /// The pickup did not happen
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn mark_failed(
        &self,
        collection_id: Uuid,
        actor: &Actor,
        reason: &str,
    ) -> AppResult<CollectionEvent> {
        validate_reason(reason).map_err(|m| AppError::validation("reason", m))?;
        let mut changes = CollectionChanges::new(CollectionStatus::Failed, actor.id, Utc::now());
        changes.failure_reason = Some(reason.trim().to_string());
        self.transition(collection_id, CollectionAction::Fail, changes)
            .await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn cancel_collection(&self, collection_id: Uuid, actor: &Actor) -> AppResult<CollectionEvent> {
        let changes = CollectionChanges::new(CollectionStatus::Cancelled, actor.id, Utc::now());
        self.transition(collection_id, CollectionAction::Cancel, changes)
            .await
    }

    /// Reject collected goods; stock is never touched
    #[instrument(skip(self, input, actor), fields(actor_id = %actor.id, quality_issue = input.quality_issue))]
    pub async fn reject_collection(
        &self,
        collection_id: Uuid,
        input: RejectCollectionInput,
        actor: &Actor,
    ) -> AppResult<CollectionEvent> {
        input.validate()?;
        validate_reason(&input.reason).map_err(|m| AppError::validation("reason", m))?;
        validate_notes(input.notes.as_deref()).map_err(|m| AppError::validation("notes", m))?;

        let (action, status) = if input.quality_issue {
            (CollectionAction::QualityReject, CollectionStatus::QualityRejected)
        } else {
            (CollectionAction::Reject, CollectionStatus::Rejected)
        };

        let now = Utc::now();
        let mut changes = CollectionChanges::new(status, actor.id, now);
        changes.rejection = Some(CollectionRejection {
            reason: input.reason.trim().to_string(),
            notes: input.notes,
            quality_issue: input.quality_issue,
            rejected_by: actor.id,
            rejected_at: now,
        });

        let collection = self.transition(collection_id, action, changes).await?;
        tracing::info!(collection_id = %collection_id, status = %collection.status, "Collection rejected");
        Ok(collection)
    }

    /// Turn a collected pickup into stock on hand and a verified purchase order
    #[instrument(skip(self, input, actor), fields(actor_id = %actor.id))]
    pub async fn verify_collection(
        &self,
        collection_id: Uuid,
        input: VerifyCollectionInput,
        actor: &Actor,
    ) -> AppResult<VerificationOutcome> {
        // 1. Load the collection and its line
        let collection = self.get(collection_id).await?;
        let line = collection
            .primary_line()
            .cloned()
            .ok_or(AppError::MalformedCollection(collection_id))?;

        if collection.status.apply(CollectionAction::Verify).is_none() {
            return Err(AppError::invalid_transition(
                "collection",
                collection.status,
                CollectionStatus::Verified,
            ));
        }

        let (linkage, pricing_issues) = validate_verification(&input)?;

        // 2. Payment owed to the supplier
        let payment_amount = input
            .verified_quantity
            .checked_mul(line.agreed_price_per_unit)
            .map(round_money)
            .ok_or_else(|| {
                AppError::validation("verified_quantity", "Verified quantity is too large to price")
            })?;

        // 3. Apply the stock effect
        let reference = Some(LedgerReference::collection(collection_id));
        let applied = self
            .apply_stock(linkage, input.verified_quantity, reference, actor)
            .await?;

        // 4. Link the supplier
        let supplier_linked = match self
            .store
            .upsert_product_supplier(NewProductSupplierLink {
                product_id: applied.product_id,
                supplier_id: collection.supplier_id,
                assigned_deliverer_id: collection.deliverer_id,
                pickup_date: None,
            })
            .await
        {
            Ok(inserted) => inserted,
            Err(err) => {
                self.compensate(collection_id, &applied, input.verified_quantity, actor)
                    .await;
                return Err(err);
            }
        };

        // 5. Record the verification, only if nobody else did
        let verification = AdminVerification {
            verified_quantity: input.verified_quantity,
            quality_notes: input.quality_notes.clone(),
            linkage: applied.linkage,
            product_id: applied.product_id,
            pricing: Some(applied.pricing_snapshot.clone()),
            payment_amount,
            verified_by: actor.id,
            verified_at: Utc::now(),
        };
        let mut changes = CollectionChanges::new(CollectionStatus::Verified, actor.id, verification.verified_at);
        changes.admin_verification = Some(verification.clone());

        let collection = match self
            .store
            .update_collection_if_status(collection_id, CollectionStatus::Collected, changes)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                self.settle_failed_record(collection_id, &verification, &applied, input.verified_quantity, actor, err)
                    .await?
            }
        };

        let low_stock = applied.change.new_stock <= applied.low_stock_threshold;
        if low_stock {
            tracing::warn!(
                product_id = %applied.product_id,
                stock = %applied.change.new_stock,
                threshold = %applied.low_stock_threshold,
                "Product is at or below its low stock threshold"
            );
        }

        // 6. Best-effort purchase order sync
        let po_sync = match line.po_id {
            Some(po_id) => self.sync_purchase_order(po_id, actor.id).await,
            None => PoSyncOutcome::NotApplicable,
        };

        // 7. Fire-and-forget demand reset
        self.spawn_demand_reset(applied.product_id, collection.supplier_id);

        tracing::info!(
            collection_id = %collection_id,
            product_id = %applied.product_id,
            quantity = %input.verified_quantity,
            payment = %payment_amount,
            "Collection verified"
        );

        Ok(VerificationOutcome {
            collection,
            product_id: applied.product_id,
            stock: applied.change,
            payment_amount,
            supplier_linked,
            po_sync,
            pricing_issues,
            low_stock,
        })
    }

    async fn apply_stock(
        &self,
        linkage: ResolvedLinkage,
        quantity: Decimal,
        reference: Option<LedgerReference>,
        actor: &Actor,
    ) -> AppResult<StockApplied> {
        match linkage {
            ResolvedLinkage::Existing {
                product_id,
                pricing: Some(pricing),
            } => {
                let (product, change) = self
                    .ledger
                    .receive_with_pricing(product_id, quantity, &pricing, reference, actor.id)
                    .await?;
                Ok(StockApplied {
                    product_id,
                    change,
                    low_stock_threshold: product.low_stock_threshold,
                    pricing_snapshot: product.pricing,
                    linkage: LinkageMode::Existing,
                })
            }
            ResolvedLinkage::Existing {
                product_id,
                pricing: None,
            } => {
                let product = self
                    .store
                    .find_product(product_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("Product", product_id))?;
                let change = self
                    .ledger
                    .receive(product_id, quantity, reference, actor.id)
                    .await?;
                Ok(StockApplied {
                    product_id,
                    change,
                    low_stock_threshold: product.low_stock_threshold,
                    pricing_snapshot: product.pricing,
                    linkage: LinkageMode::Existing,
                })
            }
            ResolvedLinkage::New(product) => {
                let product = self
                    .ledger
                    .open_with_initial_stock(product, reference, actor.id)
                    .await?;
                Ok(StockApplied {
                    product_id: product.id,
                    change: StockChange {
                        previous_stock: Decimal::ZERO,
                        new_stock: product.stock_quantity,
                    },
                    low_stock_threshold: product.low_stock_threshold,
                    pricing_snapshot: product.pricing,
                    linkage: LinkageMode::New,
                })
            }
        }
    }

    /// Decide the outcome when the verified-status write failed after stock moved
    async fn settle_failed_record(
        &self,
        collection_id: Uuid,
        verification: &AdminVerification,
        applied: &StockApplied,
        quantity: Decimal,
        actor: &Actor,
        err: AppError,
    ) -> AppResult<CollectionEvent> {
        match self.store.find_collection(collection_id).await {
            // The write landed even though the call reported an error
            Ok(Some(current)) if current.admin_verification.as_ref() == Some(verification) => Ok(current),
            Ok(_) => {
                self.compensate(collection_id, applied, quantity, actor).await;
                match err {
                    AppError::Conflict { .. } => Err(AppError::conflict(
                        "collection",
                        format!("collection {} was verified or changed concurrently", collection_id),
                    )),
                    other => Err(other),
                }
            }
            Err(read_err) => {
                tracing::error!(
                    collection_id = %collection_id,
                    product_id = %applied.product_id,
                    error = %err,
                    read_error = %read_err,
                    "Stock was received but the collection state is unknown"
                );
                Err(err)
            }
        }
    }

    /// Reverse the stock effect of a verification that will not commit
    async fn compensate(&self, collection_id: Uuid, applied: &StockApplied, quantity: Decimal, actor: &Actor) {
        let reference = Some(LedgerReference::collection(collection_id));
        match self
            .ledger
            .reverse(applied.product_id, quantity, reference, actor.id)
            .await
        {
            Ok(change) => tracing::warn!(
                collection_id = %collection_id,
                product_id = %applied.product_id,
                stock = %change.new_stock,
                "Reversed stock of an uncommitted verification"
            ),
            Err(e) => tracing::error!(
                collection_id = %collection_id,
                product_id = %applied.product_id,
                quantity = %quantity,
                error = %e,
                "Failed to reverse stock of an uncommitted verification"
            ),
        }
        if matches!(applied.linkage, LinkageMode::New) {
            // Product rows and supplier links are kept; only stock is reversed
            tracing::warn!(
                collection_id = %collection_id,
                product_id = %applied.product_id,
                "Product opened by an uncommitted verification is left in place"
            );
        }
    }

    async fn sync_purchase_order(&self, po_id: Uuid, actor_id: Uuid) -> PoSyncOutcome {
        match self.orders.advance_to_verified(po_id, actor_id).await {
            Ok(po) => PoSyncOutcome::Verified {
                po_id,
                po_number: po.po_number,
            },
            Err(e) => {
                tracing::warn!(po_id = %po_id, error = %e, "Purchase order sync after verification failed");
                PoSyncOutcome::Warning {
                    po_id,
                    message: e.to_string(),
                }
            }
        }
    }

    fn spawn_demand_reset(&self, product_id: Uuid, supplier_id: Uuid) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.reset_supplier_demand(product_id, supplier_id).await {
                tracing::warn!(
                    product_id = %product_id,
                    supplier_id = %supplier_id,
                    error = %e,
                    "Supplier demand reset failed"
                );
            }
        });
    }

    async fn transition(
        &self,
        collection_id: Uuid,
        action: CollectionAction,
        changes: CollectionChanges,
    ) -> AppResult<CollectionEvent> {
        let current = self.get(collection_id).await?;
        if current.status.apply(action) != Some(changes.status) {
            return Err(AppError::invalid_transition(
                "collection",
                current.status,
                changes.status,
            ));
        }
        self.store
            .update_collection_if_status(collection_id, current.status, changes)
            .await
    }
}

/// Linkage after validation, with pricing recomputed server-side
enum ResolvedLinkage {
    Existing {
        product_id: Uuid,
        pricing: Option<ProductPricing>,
    },
    New(NewProduct),
}

fn validate_verification(input: &VerifyCollectionInput) -> AppResult<(ResolvedLinkage, Vec<PricingIssue>)> {
    validate_verified_quantity(input.verified_quantity)
        .map_err(|m| AppError::validation("verified_quantity", m))?;
    validate_notes(input.quality_notes.as_deref())
        .map_err(|m| AppError::validation("quality_notes", m))?;

    match &input.linkage {
        ProductLinkage::Existing {
            product_id,
            update_pricing: false,
            ..
        } => Ok((
            ResolvedLinkage::Existing {
                product_id: *product_id,
                pricing: None,
            },
            Vec::new(),
        )),
        ProductLinkage::Existing {
            product_id,
            update_pricing: true,
            pricing,
        } => {
            let pricing = pricing.clone().ok_or_else(|| {
                AppError::validation("pricing", "Pricing is required when updating pricing")
            })?;
            let (pricing, issues) = prepare_pricing(pricing)?;
            Ok((
                ResolvedLinkage::Existing {
                    product_id: *product_id,
                    pricing: Some(pricing),
                },
                issues,
            ))
        }
        ProductLinkage::New(product) => {
            product.validate()?;
            if product.name.trim().is_empty() {
                return Err(AppError::validation("name", "Product name is required"));
            }
            if product.low_stock_threshold < Decimal::ZERO {
                return Err(AppError::validation(
                    "low_stock_threshold",
                    "Low stock threshold cannot be negative",
                ));
            }
            let (pricing, issues) = prepare_pricing(product.pricing.clone())?;
            Ok((
                ResolvedLinkage::New(NewProduct {
                    name: product.name.trim().to_string(),
                    category: product.category.clone(),
                    sku: product.sku.clone(),
                    pricing,
                    initial_stock: input.verified_quantity,
                    low_stock_threshold: product.low_stock_threshold,
                }),
                issues,
            ))
        }
    }
}

/// Validate a submitted pricing configuration and re-derive its ratios and prices
fn prepare_pricing(mut pricing: ProductPricing) -> AppResult<(ProductPricing, Vec<PricingIssue>)> {
    validate_pricing(&pricing).map_err(|m| AppError::validation("pricing", m))?;
    let issues = pricing.recompute();
    Ok((pricing, issues))
}
