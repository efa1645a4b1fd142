//! Product stock ledger
//!
//! Every change to `Product.stock_quantity` goes through here: an atomic
//! store increment followed by an appended stock transaction.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::{
    LedgerReference, NewProduct, NewStockTransaction, Product, ProductPricing, StockChange,
    StockTransaction, StockTransactionType,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::Store;

#[derive(Clone)]
pub struct ProductStockLedger {
    store: Arc<dyn Store>,
}

impl ProductStockLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Receive verified goods into stock
    #[instrument(skip(self))]
    pub async fn receive(
        &self,
        product_id: Uuid,
        quantity: Decimal,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<StockChange> {
        let change = self.store.increment_stock(product_id, quantity).await?;
        self.record(
            product_id,
            change,
            StockTransactionType::CollectionVerified,
            reference,
            actor_id,
        )
        .await;
        Ok(change)
    }

    /// Receive goods and overwrite the pricing configuration in one store operation
    #[instrument(skip(self, pricing))]
    pub async fn receive_with_pricing(
        &self,
        product_id: Uuid,
        quantity: Decimal,
        pricing: &ProductPricing,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<(Product, StockChange)> {
        let (product, change) = self
            .store
            .increment_stock_with_pricing(product_id, quantity, pricing)
            .await?;
        self.record(
            product_id,
            change,
            StockTransactionType::CollectionVerified,
            reference,
            actor_id,
        )
        .await;
        Ok((product, change))
    }

    /// Create a product whose opening stock is `product.initial_stock`
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn open_with_initial_stock(
        &self,
        product: NewProduct,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<Product> {
        let product = self.store.insert_product(product).await?;
        let change = StockChange {
            previous_stock: Decimal::ZERO,
            new_stock: product.stock_quantity,
        };
        self.record(
            product.id,
            change,
            StockTransactionType::InitialStock,
            reference,
            actor_id,
        )
        .await;
        Ok(product)
    }

    /// Take back stock added by a verification that did not commit
    #[instrument(skip(self))]
    pub async fn reverse(
        &self,
        product_id: Uuid,
        quantity: Decimal,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<StockChange> {
        let change = self.store.increment_stock(product_id, -quantity).await?;
        self.record(
            product_id,
            change,
            StockTransactionType::VerificationReversal,
            reference,
            actor_id,
        )
        .await;
        Ok(change)
    }

    /// Stock history of a product, oldest first
    pub async fn history(&self, product_id: Uuid) -> AppResult<Vec<StockTransaction>> {
        if self.store.find_product(product_id).await?.is_none() {
            return Err(AppError::not_found("Product", product_id));
        }
        self.store.list_stock_transactions(product_id).await
    }

    async fn record(
        &self,
        product_id: Uuid,
        change: StockChange,
        transaction_type: StockTransactionType,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) {
        let entry = NewStockTransaction {
            product_id,
            previous_stock: change.previous_stock,
            new_stock: change.new_stock,
            transaction_type,
            reference,
            performed_by: actor_id,
        };

        // Stock has already moved; a failed append is logged, never returned
        if let Err(e) = self.store.append_stock_transaction(entry).await {
            tracing::warn!(
                product_id = %product_id,
                transaction_type = transaction_type.as_str(),
                error = %e,
                "Failed to append stock transaction"
            );
        } else {
            tracing::debug!(
                product_id = %product_id,
                previous = %change.previous_stock,
                new = %change.new_stock,
                "Stock {}",
                transaction_type.as_str()
            );
        }
    }
}
