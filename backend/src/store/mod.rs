//! Storage port for the procurement services
//!
//! Every mutation that can race is expressed as a single store-level
//! operation: atomic stock increments, conditional status updates and
//! idempotent upserts. Services never write back a value they read earlier.

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{
    CashTransaction, CollectionChanges, CollectionEvent, CollectionStatus, DelivererCashAccount,
    NewCashTransaction, NewCollectionEvent, NewProduct, NewProductSupplierLink, NewPurchaseOrder,
    NewStockTransaction, Product, ProductPricing, ProductSupplierLink, PurchaseOrder,
    PurchaseOrderChanges, PurchaseOrderStatus, PurchaseOrderStatusChange, StockChange,
    StockTransaction,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by the health check
    async fn ping(&self) -> AppResult<()>;

    // ------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------

    /// Next value of a named counter; values are unique and increasing
    async fn next_sequence_value(&self, sequence: &str) -> AppResult<i64>;

    // ------------------------------------------------------------------
    // Purchase orders
    // ------------------------------------------------------------------

    async fn insert_purchase_order(&self, po: NewPurchaseOrder) -> AppResult<PurchaseOrder>;

    async fn find_purchase_order(&self, id: Uuid) -> AppResult<Option<PurchaseOrder>>;

    /// Apply `changes` only if the order is still in `expected`.
    ///
    /// Fails with `Conflict` when the status moved, `NotFound` when the
    /// order does not exist.
    async fn update_purchase_order_if_status(
        &self,
        id: Uuid,
        expected: PurchaseOrderStatus,
        changes: PurchaseOrderChanges,
    ) -> AppResult<PurchaseOrder>;

    async fn append_status_change(&self, change: PurchaseOrderStatusChange) -> AppResult<()>;

    /// Status changes of an order, oldest first
    async fn list_status_changes(&self, po_id: Uuid) -> AppResult<Vec<PurchaseOrderStatusChange>>;

    // ------------------------------------------------------------------
    // Products and stock
    // ------------------------------------------------------------------

    /// Insert a product with its opening stock
    async fn insert_product(&self, product: NewProduct) -> AppResult<Product>;

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>>;

    /// Add `delta` to the stock in one indivisible step
    async fn increment_stock(&self, product_id: Uuid, delta: Decimal) -> AppResult<StockChange>;

    /// Add `delta` to the stock and overwrite the pricing configuration as one unit
    async fn increment_stock_with_pricing(
        &self,
        product_id: Uuid,
        delta: Decimal,
        pricing: &ProductPricing,
    ) -> AppResult<(Product, StockChange)>;

    /// Overwrite the pricing configuration; stock is left untouched
    async fn update_product_pricing(
        &self,
        product_id: Uuid,
        pricing: &ProductPricing,
    ) -> AppResult<Product>;

    async fn append_stock_transaction(
        &self,
        transaction: NewStockTransaction,
    ) -> AppResult<StockTransaction>;

    /// Stock history of a product, oldest first
    async fn list_stock_transactions(&self, product_id: Uuid) -> AppResult<Vec<StockTransaction>>;

    // ------------------------------------------------------------------
    // Product ↔ supplier links
    // ------------------------------------------------------------------

    /// Insert the link unless the pair is already linked.
    ///
    /// Returns whether a row was inserted. The first link of a product
    /// becomes its primary supplier.
    async fn upsert_product_supplier(&self, link: NewProductSupplierLink) -> AppResult<bool>;

    async fn list_product_suppliers(&self, product_id: Uuid) -> AppResult<Vec<ProductSupplierLink>>;

    /// Clear outstanding demand towards a supplier
    async fn reset_supplier_demand(&self, product_id: Uuid, supplier_id: Uuid) -> AppResult<()>;

    // ------------------------------------------------------------------
    // Collections
    // ------------------------------------------------------------------

    async fn insert_collection(&self, collection: NewCollectionEvent) -> AppResult<CollectionEvent>;

    async fn find_collection(&self, id: Uuid) -> AppResult<Option<CollectionEvent>>;

    /// Apply `changes` only if the collection is still in `expected`
    async fn update_collection_if_status(
        &self,
        id: Uuid,
        expected: CollectionStatus,
        changes: CollectionChanges,
    ) -> AppResult<CollectionEvent>;

    // ------------------------------------------------------------------
    // Deliverer cash
    // ------------------------------------------------------------------

    /// Increment the balance by the signed amount and record the movement
    /// together. Creates the account on first use.
    async fn apply_cash_transaction(
        &self,
        transaction: NewCashTransaction,
    ) -> AppResult<(DelivererCashAccount, CashTransaction)>;

    async fn find_cash_account(&self, deliverer_id: Uuid) -> AppResult<Option<DelivererCashAccount>>;
}
