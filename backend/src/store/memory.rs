//! In-memory store backed by `DashMap`
//!
//! Each mutation runs while holding the shard lock of the key it touches,
//! which gives the same per-record atomicity the SQL statements give in
//! PostgreSQL. Used by the `memory` backend and by the test-suite.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use shared::{
    CashTransaction, CollectionChanges, CollectionEvent, CollectionStatus, DelivererCashAccount,
    NewCashTransaction, NewCollectionEvent, NewProduct, NewProductSupplierLink, NewPurchaseOrder,
    NewStockTransaction, Product, ProductPricing, ProductSupplierLink, PurchaseOrder,
    PurchaseOrderChanges, PurchaseOrderStatus, PurchaseOrderStatusChange, StockChange,
    StockTransaction,
};
use uuid::Uuid;

use super::Store;
use crate::error::{AppError, AppResult};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    sequences: DashMap<String, i64>,
    purchase_orders: DashMap<Uuid, PurchaseOrder>,
    status_changes: DashMap<Uuid, Vec<PurchaseOrderStatusChange>>,
    products: DashMap<Uuid, Product>,
    stock_transactions: DashMap<Uuid, Vec<StockTransaction>>,
    /// Links grouped by product so primary assignment is decided under one lock
    product_suppliers: DashMap<Uuid, Vec<ProductSupplierLink>>,
    collections: DashMap<Uuid, CollectionEvent>,
    cash_accounts: DashMap<Uuid, DelivererCashAccount>,
    cash_transactions: DashMap<Uuid, Vec<CashTransaction>>,
    stock_writes_unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every stock write fail with `StoreUnavailable` until switched back
    pub fn set_stock_writes_unavailable(&self, unavailable: bool) {
        self.inner
            .stock_writes_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    fn check_stock_writes(&self) -> AppResult<()> {
        if self.inner.stock_writes_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(
                "stock writes are unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn status_conflict(resource: &str, expected: impl std::fmt::Display, found: impl std::fmt::Display) -> AppError {
    AppError::conflict(
        resource,
        format!("expected status '{}', found '{}'", expected, found),
    )
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn next_sequence_value(&self, sequence: &str) -> AppResult<i64> {
        let mut counter = self.inner.sequences.entry(sequence.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn insert_purchase_order(&self, po: NewPurchaseOrder) -> AppResult<PurchaseOrder> {
        if self
            .inner
            .purchase_orders
            .iter()
            .any(|existing| existing.po_number == po.po_number)
        {
            return Err(AppError::DuplicateEntry(format!("po_number {}", po.po_number)));
        }

        let now = Utc::now();
        let record = PurchaseOrder {
            id: Uuid::new_v4(),
            total_amount: po.total_amount()?,
            po_number: po.po_number,
            supplier_id: po.supplier_id,
            product_id: po.product_id,
            quantity: po.quantity,
            unit: po.unit,
            unit_price: po.unit_price,
            status: PurchaseOrderStatus::Draft,
            assigned_deliverer_id: po.assigned_deliverer_id,
            pickup_date: po.pickup_date,
            notes: po.notes,
            collection_window: None,
            advance_payment_terms: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
            created_by: po.created_by,
            created_at: now,
            updated_by: None,
            updated_at: now,
        };
        self.inner.purchase_orders.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_purchase_order(&self, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        Ok(self.inner.purchase_orders.get(&id).map(|po| po.value().clone()))
    }

    async fn update_purchase_order_if_status(
        &self,
        id: Uuid,
        expected: PurchaseOrderStatus,
        changes: PurchaseOrderChanges,
    ) -> AppResult<PurchaseOrder> {
        let mut po = self
            .inner
            .purchase_orders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Purchase order", id))?;

        if po.status != expected {
            return Err(status_conflict("purchase_order", expected, po.status));
        }
        changes.apply_to(po.value_mut());
        Ok(po.value().clone())
    }

    async fn append_status_change(&self, change: PurchaseOrderStatusChange) -> AppResult<()> {
        self.inner
            .status_changes
            .entry(change.po_id)
            .or_default()
            .push(change);
        Ok(())
    }

    async fn list_status_changes(&self, po_id: Uuid) -> AppResult<Vec<PurchaseOrderStatusChange>> {
        Ok(self
            .inner
            .status_changes
            .get(&po_id)
            .map(|changes| changes.value().clone())
            .unwrap_or_default())
    }

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product> {
        self.check_stock_writes()?;

        let now = Utc::now();
        let record = Product {
            id: Uuid::new_v4(),
            name: product.name,
            category: product.category,
            sku: product.sku,
            pricing: product.pricing,
            stock_quantity: product.initial_stock,
            low_stock_threshold: product.low_stock_threshold,
            created_at: now,
            updated_at: now,
        };
        self.inner.products.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.inner.products.get(&id).map(|p| p.value().clone()))
    }

    async fn increment_stock(&self, product_id: Uuid, delta: Decimal) -> AppResult<StockChange> {
        self.check_stock_writes()?;

        let mut product = self
            .inner
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::not_found("Product", product_id))?;

        let previous_stock = product.stock_quantity;
        product.stock_quantity = previous_stock
            .checked_add(delta)
            .ok_or_else(|| AppError::validation("quantity", "Stock quantity out of range"))?;
        product.updated_at = Utc::now();

        Ok(StockChange {
            previous_stock,
            new_stock: product.stock_quantity,
        })
    }

    async fn increment_stock_with_pricing(
        &self,
        product_id: Uuid,
        delta: Decimal,
        pricing: &ProductPricing,
    ) -> AppResult<(Product, StockChange)> {
        self.check_stock_writes()?;

        let mut product = self
            .inner
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::not_found("Product", product_id))?;

        let previous_stock = product.stock_quantity;
        product.stock_quantity = previous_stock
            .checked_add(delta)
            .ok_or_else(|| AppError::validation("quantity", "Stock quantity out of range"))?;
        product.pricing = pricing.clone();
        product.updated_at = Utc::now();

        let change = StockChange {
            previous_stock,
            new_stock: product.stock_quantity,
        };
        Ok((product.value().clone(), change))
    }

    async fn update_product_pricing(
        &self,
        product_id: Uuid,
        pricing: &ProductPricing,
    ) -> AppResult<Product> {
        let mut product = self
            .inner
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::not_found("Product", product_id))?;

        product.pricing = pricing.clone();
        product.updated_at = Utc::now();
        Ok(product.value().clone())
    }

    async fn append_stock_transaction(
        &self,
        transaction: NewStockTransaction,
    ) -> AppResult<StockTransaction> {
        let record = StockTransaction {
            id: Uuid::new_v4(),
            product_id: transaction.product_id,
            previous_stock: transaction.previous_stock,
            new_stock: transaction.new_stock,
            quantity_change: transaction.quantity_change(),
            transaction_type: transaction.transaction_type,
            reference_id: transaction.reference.map(|r| r.reference_id),
            reference_type: transaction.reference.map(|r| r.reference_type),
            performed_by: transaction.performed_by,
            created_at: Utc::now(),
        };
        self.inner
            .stock_transactions
            .entry(record.product_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn list_stock_transactions(&self, product_id: Uuid) -> AppResult<Vec<StockTransaction>> {
        Ok(self
            .inner
            .stock_transactions
            .get(&product_id)
            .map(|txs| txs.value().clone())
            .unwrap_or_default())
    }

    async fn upsert_product_supplier(&self, link: NewProductSupplierLink) -> AppResult<bool> {
        let mut links = self.inner.product_suppliers.entry(link.product_id).or_default();

        if links.iter().any(|l| l.supplier_id == link.supplier_id) {
            return Ok(false);
        }

        let is_primary = !links.iter().any(|l| l.is_primary);
        links.push(ProductSupplierLink {
            product_id: link.product_id,
            supplier_id: link.supplier_id,
            is_primary,
            is_active: true,
            assigned_deliverer_id: link.assigned_deliverer_id,
            pickup_date: link.pickup_date,
            pending_demand: Decimal::ZERO,
            demand_reset_at: None,
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_product_suppliers(&self, product_id: Uuid) -> AppResult<Vec<ProductSupplierLink>> {
        Ok(self
            .inner
            .product_suppliers
            .get(&product_id)
            .map(|links| links.value().clone())
            .unwrap_or_default())
    }

    async fn reset_supplier_demand(&self, product_id: Uuid, supplier_id: Uuid) -> AppResult<()> {
        if let Some(mut links) = self.inner.product_suppliers.get_mut(&product_id) {
            if let Some(link) = links.iter_mut().find(|l| l.supplier_id == supplier_id) {
                link.pending_demand = Decimal::ZERO;
                link.demand_reset_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn insert_collection(&self, collection: NewCollectionEvent) -> AppResult<CollectionEvent> {
        let now = Utc::now();
        let record = CollectionEvent {
            id: Uuid::new_v4(),
            supplier_id: collection.supplier_id,
            deliverer_id: collection.deliverer_id,
            status: CollectionStatus::Pending,
            collection_products: collection.collection_products,
            admin_verification: None,
            rejection: None,
            failure_reason: None,
            collected_at: None,
            created_by: collection.created_by,
            created_at: now,
            updated_by: None,
            updated_at: now,
        };
        self.inner.collections.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_collection(&self, id: Uuid) -> AppResult<Option<CollectionEvent>> {
        Ok(self.inner.collections.get(&id).map(|c| c.value().clone()))
    }

    async fn update_collection_if_status(
        &self,
        id: Uuid,
        expected: CollectionStatus,
        changes: CollectionChanges,
    ) -> AppResult<CollectionEvent> {
        let mut collection = self
            .inner
            .collections
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Collection", id))?;

        if collection.status != expected {
            return Err(status_conflict("collection", expected, collection.status));
        }
        changes.apply_to(collection.value_mut());
        Ok(collection.value().clone())
    }

    async fn apply_cash_transaction(
        &self,
        transaction: NewCashTransaction,
    ) -> AppResult<(DelivererCashAccount, CashTransaction)> {
        let now = Utc::now();
        let mut account = self
            .inner
            .cash_accounts
            .entry(transaction.deliverer_id)
            .or_insert_with(|| DelivererCashAccount {
                deliverer_id: transaction.deliverer_id,
                cash_balance: Decimal::ZERO,
                updated_at: now,
            });

        let amount = transaction.signed_amount();
        account.cash_balance = account
            .cash_balance
            .checked_add(amount)
            .ok_or_else(|| AppError::validation("amount", "Cash balance out of range"))?;
        account.updated_at = now;

        let record = CashTransaction {
            id: Uuid::new_v4(),
            deliverer_id: transaction.deliverer_id,
            amount,
            kind: transaction.kind,
            reference_id: transaction.reference.map(|r| r.reference_id),
            reference_type: transaction.reference.map(|r| r.reference_type),
            balance_after: account.cash_balance,
            performed_by: transaction.performed_by,
            created_at: now,
        };
        // Appended while the account entry is still locked
        self.inner
            .cash_transactions
            .entry(transaction.deliverer_id)
            .or_default()
            .push(record.clone());

        Ok((account.value().clone(), record))
    }

    async fn find_cash_account(&self, deliverer_id: Uuid) -> AppResult<Option<DelivererCashAccount>> {
        Ok(self.inner.cash_accounts.get(&deliverer_id).map(|a| a.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{LedgerReference, SellingSide, StockTransactionType};

    fn pricing() -> ProductPricing {
        ProductPricing {
            purchase_unit: "kg".to_string(),
            purchase_price: Decimal::from(10),
            b2c: SellingSide::new(Decimal::from(250), "g", Decimal::new(15, 1)),
            b2b: SellingSide::new(Decimal::from(1), "kg", Decimal::new(12, 1)),
        }
    }

    fn new_product(initial_stock: i64) -> NewProduct {
        NewProduct {
            name: "Robusta green beans".to_string(),
            category: None,
            sku: None,
            pricing: pricing(),
            initial_stock: Decimal::from(initial_stock),
            low_stock_threshold: Decimal::ZERO,
        }
    }

    #[tokio::test]
    async fn test_sequence_values_increase() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_sequence_value("po").await.unwrap(), 1);
        assert_eq!(store.next_sequence_value("po").await.unwrap(), 2);
        assert_eq!(store.next_sequence_value("other").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_stock_reports_previous_and_new() {
        let store = InMemoryStore::new();
        let product = store.insert_product(new_product(3)).await.unwrap();

        let change = store.increment_stock(product.id, Decimal::from(4)).await.unwrap();
        assert_eq!(change.previous_stock, Decimal::from(3));
        assert_eq!(change.new_stock, Decimal::from(7));
    }

    #[tokio::test]
    async fn test_increment_stock_out_of_range_leaves_stock() {
        let store = InMemoryStore::new();
        let product = store.insert_product(new_product(3)).await.unwrap();

        let result = store.increment_stock(product.id, Decimal::MAX).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));

        let current = store.find_product(product.id).await.unwrap().unwrap();
        assert_eq!(current.stock_quantity, Decimal::from(3));
    }

    #[tokio::test]
    async fn test_update_pricing_leaves_stock_alone() {
        let store = InMemoryStore::new();
        let product = store.insert_product(new_product(9)).await.unwrap();

        let mut changed = pricing();
        changed.purchase_price = Decimal::from(12);
        let updated = store.update_product_pricing(product.id, &changed).await.unwrap();

        assert_eq!(updated.stock_quantity, Decimal::from(9));
        assert_eq!(updated.pricing.purchase_price, Decimal::from(12));
    }

    #[tokio::test]
    async fn test_stock_writes_unavailable_switch() {
        let store = InMemoryStore::new();
        let product = store.insert_product(new_product(1)).await.unwrap();

        store.set_stock_writes_unavailable(true);
        let err = store.increment_stock(product.id, Decimal::ONE).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));

        store.set_stock_writes_unavailable(false);
        assert!(store.increment_stock(product.id, Decimal::ONE).await.is_ok());
    }

    #[tokio::test]
    async fn test_first_supplier_link_is_primary() {
        let store = InMemoryStore::new();
        let product_id = Uuid::new_v4();
        let link = |supplier_id| NewProductSupplierLink {
            product_id,
            supplier_id,
            assigned_deliverer_id: None,
            pickup_date: None,
        };
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(store.upsert_product_supplier(link(first)).await.unwrap());
        assert!(store.upsert_product_supplier(link(second)).await.unwrap());
        assert!(!store.upsert_product_supplier(link(first)).await.unwrap());

        let links = store.list_product_suppliers(product_id).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links.iter().filter(|l| l.is_primary).count(), 1);
        assert!(links.iter().any(|l| l.supplier_id == first && l.is_primary));
    }

    #[tokio::test]
    async fn test_stock_transactions_keep_order() {
        let store = InMemoryStore::new();
        let product_id = Uuid::new_v4();
        let actor = Uuid::new_v4();
        for (previous, new) in [(0, 5), (5, 12)] {
            store
                .append_stock_transaction(NewStockTransaction {
                    product_id,
                    previous_stock: Decimal::from(previous),
                    new_stock: Decimal::from(new),
                    transaction_type: StockTransactionType::CollectionVerified,
                    reference: Some(LedgerReference::collection(Uuid::new_v4())),
                    performed_by: actor,
                })
                .await
                .unwrap();
        }

        let history = store.list_stock_transactions(product_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].quantity_change, Decimal::from(5));
        assert_eq!(history[1].quantity_change, Decimal::from(7));
    }
}
