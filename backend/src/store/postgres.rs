//! PostgreSQL store
//!
//! Races are settled by the database: stock moves through
//! `stock_quantity = stock_quantity + $n`, status changes through
//! `WHERE status = $expected`, supplier links through `ON CONFLICT DO NOTHING`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    AdminVerification, AdvancePaymentTerms, CashTransaction, CollectionChanges, CollectionEvent,
    CollectionProduct, CollectionRejection, CollectionStatus, CollectionWindow,
    DelivererCashAccount, NewCashTransaction, NewCollectionEvent, NewProduct,
    NewProductSupplierLink, NewPurchaseOrder, NewStockTransaction, Product, ProductPricing,
    ProductSupplierLink, PurchaseOrder, PurchaseOrderChanges, PurchaseOrderStatus,
    PurchaseOrderStatusChange, StockChange, StockTransaction,
};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::Store;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Run a store call, failing with `StoreUnavailable` past the configured timeout
    async fn bounded<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::StoreUnavailable(format!(
                "store call exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// Distinguish a missing row from a status mismatch after a conditional update
    async fn status_mismatch(&self, table: &'static str, resource: &str, id: Uuid, expected: &str) -> AppError {
        let query = format!("SELECT status FROM {} WHERE id = $1", table);
        match sqlx::query_scalar::<_, String>(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await
        {
            Ok(Some(found)) => AppError::conflict(
                resource,
                format!("expected status '{}', found '{}'", expected, found),
            ),
            Ok(None) => AppError::not_found(resource, id),
            Err(e) => e.into(),
        }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct PurchaseOrderRow {
    id: Uuid,
    po_number: String,
    supplier_id: Uuid,
    product_id: Uuid,
    quantity: Decimal,
    unit: String,
    unit_price: Decimal,
    total_amount: Decimal,
    status: String,
    assigned_deliverer_id: Option<Uuid>,
    pickup_date: Option<NaiveDate>,
    notes: Option<String>,
    collection_window: Option<Json<CollectionWindow>>,
    advance_payment_terms: Option<Json<AdvancePaymentTerms>>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<Uuid>,
    rejected_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    cancelled_by: Option<Uuid>,
    cancelled_at: Option<DateTime<Utc>>,
    cancellation_reason: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = AppError;

    fn try_from(row: PurchaseOrderRow) -> AppResult<Self> {
        Ok(PurchaseOrder {
            id: row.id,
            po_number: row.po_number,
            supplier_id: row.supplier_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit: row.unit,
            unit_price: row.unit_price,
            total_amount: row.total_amount,
            status: row.status.parse()?,
            assigned_deliverer_id: row.assigned_deliverer_id,
            pickup_date: row.pickup_date,
            notes: row.notes,
            collection_window: row.collection_window.map(|j| j.0),
            advance_payment_terms: row.advance_payment_terms.map(|j| j.0),
            approved_by: row.approved_by,
            approved_at: row.approved_at,
            rejected_by: row.rejected_by,
            rejected_at: row.rejected_at,
            rejection_reason: row.rejection_reason,
            cancelled_by: row.cancelled_by,
            cancelled_at: row.cancelled_at,
            cancellation_reason: row.cancellation_reason,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StatusChangeRow {
    po_id: Uuid,
    from_status: String,
    to_status: String,
    actor_id: Uuid,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<StatusChangeRow> for PurchaseOrderStatusChange {
    type Error = AppError;

    fn try_from(row: StatusChangeRow) -> AppResult<Self> {
        Ok(PurchaseOrderStatusChange {
            po_id: row.po_id,
            from_status: row.from_status.parse()?,
            to_status: row.to_status.parse()?,
            actor_id: row.actor_id,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: Option<String>,
    sku: Option<String>,
    pricing: Json<ProductPricing>,
    stock_quantity: Decimal,
    low_stock_threshold: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            sku: row.sku,
            pricing: row.pricing.0,
            stock_quantity: row.stock_quantity,
            low_stock_threshold: row.low_stock_threshold,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockChangeRow {
    previous_stock: Decimal,
    new_stock: Decimal,
}

#[derive(Debug, FromRow)]
struct StockTransactionRow {
    id: Uuid,
    product_id: Uuid,
    previous_stock: Decimal,
    new_stock: Decimal,
    quantity_change: Decimal,
    transaction_type: String,
    reference_id: Option<Uuid>,
    reference_type: Option<String>,
    performed_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<StockTransactionRow> for StockTransaction {
    type Error = AppError;

    fn try_from(row: StockTransactionRow) -> AppResult<Self> {
        Ok(StockTransaction {
            id: row.id,
            product_id: row.product_id,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            quantity_change: row.quantity_change,
            transaction_type: row.transaction_type.parse()?,
            reference_id: row.reference_id,
            reference_type: row.reference_type.map(|t| t.parse()).transpose()?,
            performed_by: row.performed_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProductSupplierRow {
    product_id: Uuid,
    supplier_id: Uuid,
    is_primary: bool,
    is_active: bool,
    assigned_deliverer_id: Option<Uuid>,
    pickup_date: Option<NaiveDate>,
    pending_demand: Decimal,
    demand_reset_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ProductSupplierRow> for ProductSupplierLink {
    fn from(row: ProductSupplierRow) -> Self {
        ProductSupplierLink {
            product_id: row.product_id,
            supplier_id: row.supplier_id,
            is_primary: row.is_primary,
            is_active: row.is_active,
            assigned_deliverer_id: row.assigned_deliverer_id,
            pickup_date: row.pickup_date,
            pending_demand: row.pending_demand,
            demand_reset_at: row.demand_reset_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CollectionRow {
    id: Uuid,
    supplier_id: Uuid,
    deliverer_id: Option<Uuid>,
    status: String,
    collection_products: Json<Vec<CollectionProduct>>,
    admin_verification: Option<Json<AdminVerification>>,
    rejection: Option<Json<CollectionRejection>>,
    failure_reason: Option<String>,
    collected_at: Option<DateTime<Utc>>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CollectionRow> for CollectionEvent {
    type Error = AppError;

    fn try_from(row: CollectionRow) -> AppResult<Self> {
        Ok(CollectionEvent {
            id: row.id,
            supplier_id: row.supplier_id,
            deliverer_id: row.deliverer_id,
            status: row.status.parse()?,
            collection_products: row.collection_products.0,
            admin_verification: row.admin_verification.map(|j| j.0),
            rejection: row.rejection.map(|j| j.0),
            failure_reason: row.failure_reason,
            collected_at: row.collected_at,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CashAccountRow {
    deliverer_id: Uuid,
    cash_balance: Decimal,
    updated_at: DateTime<Utc>,
}

impl From<CashAccountRow> for DelivererCashAccount {
    fn from(row: CashAccountRow) -> Self {
        DelivererCashAccount {
            deliverer_id: row.deliverer_id,
            cash_balance: row.cash_balance,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CashTransactionRow {
    id: Uuid,
    deliverer_id: Uuid,
    amount: Decimal,
    kind: String,
    reference_id: Option<Uuid>,
    reference_type: Option<String>,
    balance_after: Decimal,
    performed_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<CashTransactionRow> for CashTransaction {
    type Error = AppError;

    fn try_from(row: CashTransactionRow) -> AppResult<Self> {
        Ok(CashTransaction {
            id: row.id,
            deliverer_id: row.deliverer_id,
            amount: row.amount,
            kind: row.kind.parse()?,
            reference_id: row.reference_id,
            reference_type: row.reference_type.map(|t| t.parse()).transpose()?,
            balance_after: row.balance_after,
            performed_by: row.performed_by,
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// Store implementation
// ============================================================================

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> AppResult<()> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.db).await?;
            Ok(())
        })
        .await
    }

    async fn next_sequence_value(&self, sequence: &str) -> AppResult<i64> {
        self.bounded(async {
            let value = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO sequence_counters (name, value)
                VALUES ($1, 1)
                ON CONFLICT (name) DO UPDATE SET value = sequence_counters.value + 1
                RETURNING value
                "#,
            )
            .bind(sequence)
            .fetch_one(&self.db)
            .await?;
            Ok(value)
        })
        .await
    }

    async fn insert_purchase_order(&self, po: NewPurchaseOrder) -> AppResult<PurchaseOrder> {
        let total_amount = po.total_amount()?;
        self.bounded(async {
            let row = sqlx::query_as::<_, PurchaseOrderRow>(
                r#"
                INSERT INTO purchase_orders (
                    id, po_number, supplier_id, product_id, quantity, unit, unit_price,
                    total_amount, status, assigned_deliverer_id, pickup_date, notes, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'draft', $9, $10, $11, $12)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&po.po_number)
            .bind(po.supplier_id)
            .bind(po.product_id)
            .bind(po.quantity)
            .bind(&po.unit)
            .bind(po.unit_price)
            .bind(total_amount)
            .bind(po.assigned_deliverer_id)
            .bind(po.pickup_date)
            .bind(&po.notes)
            .bind(po.created_by)
            .fetch_one(&self.db)
            .await?;
            row.try_into()
        })
        .await
    }

    async fn find_purchase_order(&self, id: Uuid) -> AppResult<Option<PurchaseOrder>> {
        self.bounded(async {
            let row = sqlx::query_as::<_, PurchaseOrderRow>(
                "SELECT * FROM purchase_orders WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
            row.map(PurchaseOrder::try_from).transpose()
        })
        .await
    }

    async fn update_purchase_order_if_status(
        &self,
        id: Uuid,
        expected: PurchaseOrderStatus,
        changes: PurchaseOrderChanges,
    ) -> AppResult<PurchaseOrder> {
        self.bounded(async {
            let row = sqlx::query_as::<_, PurchaseOrderRow>(
                r#"
                UPDATE purchase_orders SET
                    status = $3,
                    updated_by = $4,
                    updated_at = $5,
                    approved_by = CASE WHEN $6 THEN $4 ELSE approved_by END,
                    approved_at = CASE WHEN $6 THEN $5 ELSE approved_at END,
                    rejected_by = CASE WHEN $7::TEXT IS NOT NULL THEN $4 ELSE rejected_by END,
                    rejected_at = CASE WHEN $7::TEXT IS NOT NULL THEN $5 ELSE rejected_at END,
                    rejection_reason = COALESCE($7, rejection_reason),
                    cancelled_by = CASE WHEN $8::TEXT IS NOT NULL THEN $4 ELSE cancelled_by END,
                    cancelled_at = CASE WHEN $8::TEXT IS NOT NULL THEN $5 ELSE cancelled_at END,
                    cancellation_reason = COALESCE($8, cancellation_reason),
                    collection_window = COALESCE($9, collection_window),
                    advance_payment_terms = COALESCE($10, advance_payment_terms)
                WHERE id = $1 AND status = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(expected.as_str())
            .bind(changes.status.as_str())
            .bind(changes.actor_id)
            .bind(changes.at)
            .bind(changes.approved)
            .bind(&changes.rejection_reason)
            .bind(&changes.cancellation_reason)
            .bind(changes.collection_window.clone().map(Json))
            .bind(changes.advance_payment_terms.clone().map(Json))
            .fetch_optional(&self.db)
            .await?;

            match row {
                Some(row) => row.try_into(),
                None => Err(self
                    .status_mismatch("purchase_orders", "purchase_order", id, expected.as_str())
                    .await),
            }
        })
        .await
    }

    async fn append_status_change(&self, change: PurchaseOrderStatusChange) -> AppResult<()> {
        self.bounded(async {
            sqlx::query(
                r#"
                INSERT INTO purchase_order_status_changes
                    (po_id, from_status, to_status, actor_id, note, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(change.po_id)
            .bind(change.from_status.as_str())
            .bind(change.to_status.as_str())
            .bind(change.actor_id)
            .bind(&change.note)
            .bind(change.created_at)
            .execute(&self.db)
            .await?;
            Ok(())
        })
        .await
    }

    async fn list_status_changes(&self, po_id: Uuid) -> AppResult<Vec<PurchaseOrderStatusChange>> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, StatusChangeRow>(
                r#"
                SELECT po_id, from_status, to_status, actor_id, note, created_at
                FROM purchase_order_status_changes
                WHERE po_id = $1
                ORDER BY id
                "#,
            )
            .bind(po_id)
            .fetch_all(&self.db)
            .await?;
            rows.into_iter().map(PurchaseOrderStatusChange::try_from).collect()
        })
        .await
    }

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                INSERT INTO products (
                    id, name, category, sku, pricing, stock_quantity, low_stock_threshold
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&product.name)
            .bind(&product.category)
            .bind(&product.sku)
            .bind(Json(&product.pricing))
            .bind(product.initial_stock)
            .bind(product.low_stock_threshold)
            .fetch_one(&self.db)
            .await?;
            Ok(row.into())
        })
        .await
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
            Ok(row.map(Product::from))
        })
        .await
    }

    async fn increment_stock(&self, product_id: Uuid, delta: Decimal) -> AppResult<StockChange> {
        self.bounded(async {
            let row = sqlx::query_as::<_, StockChangeRow>(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity + $2, updated_at = NOW()
                WHERE id = $1
                RETURNING stock_quantity - $2 AS previous_stock, stock_quantity AS new_stock
                "#,
            )
            .bind(product_id)
            .bind(delta)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;

            Ok(StockChange {
                previous_stock: row.previous_stock,
                new_stock: row.new_stock,
            })
        })
        .await
    }

    async fn increment_stock_with_pricing(
        &self,
        product_id: Uuid,
        delta: Decimal,
        pricing: &ProductPricing,
    ) -> AppResult<(Product, StockChange)> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                UPDATE products
                SET stock_quantity = stock_quantity + $2, pricing = $3, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(product_id)
            .bind(delta)
            .bind(Json(pricing))
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;

            let product = Product::from(row);
            let change = StockChange {
                previous_stock: product.stock_quantity - delta,
                new_stock: product.stock_quantity,
            };
            Ok((product, change))
        })
        .await
    }

    async fn update_product_pricing(
        &self,
        product_id: Uuid,
        pricing: &ProductPricing,
    ) -> AppResult<Product> {
        self.bounded(async {
            let row = sqlx::query_as::<_, ProductRow>(
                r#"
                UPDATE products SET pricing = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(product_id)
            .bind(Json(pricing))
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Product", product_id))?;
            Ok(row.into())
        })
        .await
    }

    async fn append_stock_transaction(
        &self,
        transaction: NewStockTransaction,
    ) -> AppResult<StockTransaction> {
        self.bounded(async {
            let row = sqlx::query_as::<_, StockTransactionRow>(
                r#"
                INSERT INTO stock_transactions (
                    id, product_id, previous_stock, new_stock, quantity_change,
                    transaction_type, reference_id, reference_type, performed_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(transaction.product_id)
            .bind(transaction.previous_stock)
            .bind(transaction.new_stock)
            .bind(transaction.quantity_change())
            .bind(transaction.transaction_type.as_str())
            .bind(transaction.reference.map(|r| r.reference_id))
            .bind(transaction.reference.map(|r| r.reference_type.as_str()))
            .bind(transaction.performed_by)
            .fetch_one(&self.db)
            .await?;
            row.try_into()
        })
        .await
    }

    async fn list_stock_transactions(&self, product_id: Uuid) -> AppResult<Vec<StockTransaction>> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, StockTransactionRow>(
                "SELECT * FROM stock_transactions WHERE product_id = $1 ORDER BY seq",
            )
            .bind(product_id)
            .fetch_all(&self.db)
            .await?;
            rows.into_iter().map(StockTransaction::try_from).collect()
        })
        .await
    }

    async fn upsert_product_supplier(&self, link: NewProductSupplierLink) -> AppResult<bool> {
        self.bounded(async {
            let mut tx = self.db.begin().await?;

            // Serialize link creation per product so only one link can become primary
            sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(link.product_id)
                .fetch_optional(&mut *tx)
                .await?;

            let result = sqlx::query(
                r#"
                INSERT INTO product_suppliers (
                    product_id, supplier_id, is_primary, assigned_deliverer_id, pickup_date
                )
                VALUES (
                    $1, $2,
                    NOT EXISTS (
                        SELECT 1 FROM product_suppliers WHERE product_id = $1 AND is_primary
                    ),
                    $3, $4
                )
                ON CONFLICT (product_id, supplier_id) DO NOTHING
                "#,
            )
            .bind(link.product_id)
            .bind(link.supplier_id)
            .bind(link.assigned_deliverer_id)
            .bind(link.pickup_date)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(result.rows_affected() == 1)
        })
        .await
    }

    async fn list_product_suppliers(&self, product_id: Uuid) -> AppResult<Vec<ProductSupplierLink>> {
        self.bounded(async {
            let rows = sqlx::query_as::<_, ProductSupplierRow>(
                r#"
                SELECT * FROM product_suppliers
                WHERE product_id = $1
                ORDER BY is_primary DESC, created_at
                "#,
            )
            .bind(product_id)
            .fetch_all(&self.db)
            .await?;
            Ok(rows.into_iter().map(ProductSupplierLink::from).collect())
        })
        .await
    }

    async fn reset_supplier_demand(&self, product_id: Uuid, supplier_id: Uuid) -> AppResult<()> {
        self.bounded(async {
            sqlx::query(
                r#"
                UPDATE product_suppliers
                SET pending_demand = 0, demand_reset_at = NOW()
                WHERE product_id = $1 AND supplier_id = $2
                "#,
            )
            .bind(product_id)
            .bind(supplier_id)
            .execute(&self.db)
            .await?;
            Ok(())
        })
        .await
    }

    async fn insert_collection(&self, collection: NewCollectionEvent) -> AppResult<CollectionEvent> {
        self.bounded(async {
            let row = sqlx::query_as::<_, CollectionRow>(
                r#"
                INSERT INTO collection_events (
                    id, supplier_id, deliverer_id, status, collection_products, created_by
                )
                VALUES ($1, $2, $3, 'pending', $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(collection.supplier_id)
            .bind(collection.deliverer_id)
            .bind(Json(&collection.collection_products))
            .bind(collection.created_by)
            .fetch_one(&self.db)
            .await?;
            row.try_into()
        })
        .await
    }

    async fn find_collection(&self, id: Uuid) -> AppResult<Option<CollectionEvent>> {
        self.bounded(async {
            let row = sqlx::query_as::<_, CollectionRow>(
                "SELECT * FROM collection_events WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
            row.map(CollectionEvent::try_from).transpose()
        })
        .await
    }

    async fn update_collection_if_status(
        &self,
        id: Uuid,
        expected: CollectionStatus,
        changes: CollectionChanges,
    ) -> AppResult<CollectionEvent> {
        self.bounded(async {
            let row = sqlx::query_as::<_, CollectionRow>(
                r#"
                UPDATE collection_events SET
                    status = $3,
                    updated_by = $4,
                    updated_at = $5,
                    admin_verification = COALESCE($6, admin_verification),
                    rejection = COALESCE($7, rejection),
                    failure_reason = COALESCE($8, failure_reason),
                    collected_at = COALESCE($9, collected_at)
                WHERE id = $1 AND status = $2
                RETURNING *
                "#,
            )
            .bind(id)
            .bind(expected.as_str())
            .bind(changes.status.as_str())
            .bind(changes.actor_id)
            .bind(changes.at)
            .bind(changes.admin_verification.clone().map(Json))
            .bind(changes.rejection.clone().map(Json))
            .bind(&changes.failure_reason)
            .bind(changes.collected_at)
            .fetch_optional(&self.db)
            .await?;

            match row {
                Some(row) => row.try_into(),
                None => Err(self
                    .status_mismatch("collection_events", "collection", id, expected.as_str())
                    .await),
            }
        })
        .await
    }

    async fn apply_cash_transaction(
        &self,
        transaction: NewCashTransaction,
    ) -> AppResult<(DelivererCashAccount, CashTransaction)> {
        self.bounded(async {
            let amount = transaction.signed_amount();
            let mut tx = self.db.begin().await?;

            let account = sqlx::query_as::<_, CashAccountRow>(
                r#"
                INSERT INTO deliverer_cash_accounts (deliverer_id, cash_balance, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (deliverer_id) DO UPDATE
                SET cash_balance = deliverer_cash_accounts.cash_balance + EXCLUDED.cash_balance,
                    updated_at = NOW()
                RETURNING deliverer_id, cash_balance, updated_at
                "#,
            )
            .bind(transaction.deliverer_id)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;

            let record = sqlx::query_as::<_, CashTransactionRow>(
                r#"
                INSERT INTO deliverer_cash_transactions (
                    id, deliverer_id, amount, kind, reference_id, reference_type,
                    balance_after, performed_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(transaction.deliverer_id)
            .bind(amount)
            .bind(transaction.kind.as_str())
            .bind(transaction.reference.map(|r| r.reference_id))
            .bind(transaction.reference.map(|r| r.reference_type.as_str()))
            .bind(account.cash_balance)
            .bind(transaction.performed_by)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok((account.into(), record.try_into()?))
        })
        .await
    }

    async fn find_cash_account(&self, deliverer_id: Uuid) -> AppResult<Option<DelivererCashAccount>> {
        self.bounded(async {
            let row = sqlx::query_as::<_, CashAccountRow>(
                "SELECT deliverer_id, cash_balance, updated_at FROM deliverer_cash_accounts WHERE deliverer_id = $1",
            )
            .bind(deliverer_id)
            .fetch_optional(&self.db)
            .await?;
            Ok(row.map(DelivererCashAccount::from))
        })
        .await
    }
}
