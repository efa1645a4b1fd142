//! Route definitions for the supplier procurement API

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/collections", collection_routes())
        .nest("/products", product_routes())
        .nest("/pricing", pricing_routes())
        .route("/units", get(handlers::list_units))
        .nest("/deliverers", deliverer_routes())
}

/// Purchase order lifecycle and batch routes
fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_purchase_order))
        .route("/batch/approve", post(handlers::batch_approve_purchase_orders))
        .route("/batch/reject", post(handlers::batch_reject_purchase_orders))
        .route("/:po_id", get(handlers::get_purchase_order))
        .route("/:po_id/history", get(handlers::get_purchase_order_history))
        .route("/:po_id/approve", post(handlers::approve_purchase_order))
        .route("/:po_id/reject", post(handlers::reject_purchase_order))
        .route("/:po_id/in-transit", post(handlers::mark_purchase_order_in_transit))
        .route("/:po_id/delivered", post(handlers::mark_purchase_order_delivered))
        .route("/:po_id/cancel", post(handlers::cancel_purchase_order))
}

/// Collection routes
fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_collection))
        .route("/:collection_id", get(handlers::get_collection))
        .route("/:collection_id/collected", post(handlers::mark_collection_collected))
        .route("/:collection_id/failed", post(handlers::mark_collection_failed))
        .route("/:collection_id/cancel", post(handlers::cancel_collection))
        .route("/:collection_id/verify", post(handlers::verify_collection))
        .route("/:collection_id/reject", post(handlers::reject_collection))
}

/// Product pricing, stock history and supplier routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:product_id/pricing",
            get(handlers::get_product_pricing).post(handlers::edit_product_pricing),
        )
        .route("/:product_id/stock-transactions", get(handlers::get_stock_transactions))
        .route("/:product_id/suppliers", get(handlers::get_product_suppliers))
}

/// Stateless calculator routes (public)
fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route("/ratio", post(handlers::calculate_ratio))
        .route("/price", post(handlers::calculate_price))
        .route("/discount", post(handlers::calculate_discount))
}

/// Deliverer cash routes
fn deliverer_routes() -> Router<AppState> {
    Router::new()
        .route("/:deliverer_id/cash", get(handlers::get_deliverer_cash))
        .route("/:deliverer_id/cash/replenish", post(handlers::replenish_deliverer_cash))
        .route("/:deliverer_id/cash/disburse", post(handlers::disburse_deliverer_cash))
}
