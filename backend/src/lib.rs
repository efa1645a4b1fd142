//! Supplier procurement backend
//!
//! Purchase orders, collection verification into stock, product pricing and
//! deliverer cash, served over HTTP and backed by a pluggable store.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{
    BatchApprovalCoordinator, CollectionVerificationService, DelivererCashService,
    ProductPricingService, ProductStockLedger, PurchaseOrderService,
};
use store::Store;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn purchase_orders(&self) -> PurchaseOrderService {
        PurchaseOrderService::new(self.store.clone(), self.config.purchasing.clone())
    }

    pub fn batch_approvals(&self) -> BatchApprovalCoordinator {
        BatchApprovalCoordinator::new(self.purchase_orders())
    }

    pub fn stock_ledger(&self) -> ProductStockLedger {
        ProductStockLedger::new(self.store.clone())
    }

    pub fn collections(&self) -> CollectionVerificationService {
        CollectionVerificationService::new(
            self.store.clone(),
            self.stock_ledger(),
            self.purchase_orders(),
        )
    }

    pub fn pricing(&self) -> ProductPricingService {
        ProductPricingService::new(self.store.clone())
    }

    pub fn deliverer_cash(&self) -> DelivererCashService {
        DelivererCashService::new(self.store.clone())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Supplier Procurement API v1"
}
