//! Fixtures shared by the backend integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use procurement_backend::services::collection::CreateCollectionInput;
use procurement_backend::services::purchase_order::CreatePurchaseOrderInput;
use procurement_backend::store::{InMemoryStore, Store};
use procurement_backend::{AppState, Config};
use rust_decimal::Decimal;
use shared::{
    Actor, CollectionEvent, CollectionProduct, NewProduct, Product, ProductPricing, PurchaseOrder,
    SellingSide,
};
use uuid::Uuid;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
    pub staff: Actor,
    pub admin: Actor,
}

pub fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let dyn_store: Arc<dyn Store> = store.clone();
    TestApp {
        store,
        state: AppState::new(dyn_store, Config::in_memory()),
        staff: Actor::staff(Uuid::new_v4()),
        admin: Actor::admin(Uuid::new_v4()),
    }
}

/// Bought per kg at 100; B2C sells 250 g at ×1.5, B2B sells 1 kg at ×1.2
pub fn kg_pricing() -> ProductPricing {
    let mut pricing = ProductPricing {
        purchase_unit: "kg".to_string(),
        purchase_price: dec("100"),
        b2c: SellingSide::new(dec("250"), "g", dec("1.5")),
        b2b: SellingSide::new(dec("1"), "kg", dec("1.2")),
    };
    pricing.recompute();
    pricing
}

pub async fn seed_product(app: &TestApp, stock: &str, threshold: &str) -> Product {
    app.store
        .insert_product(NewProduct {
            name: "Arabica green beans".to_string(),
            category: Some("coffee".to_string()),
            sku: None,
            pricing: kg_pricing(),
            initial_stock: dec(stock),
            low_stock_threshold: dec(threshold),
        })
        .await
        .unwrap()
}

pub fn draft_input(product_id: Uuid) -> CreatePurchaseOrderInput {
    CreatePurchaseOrderInput {
        supplier_id: Uuid::new_v4(),
        product_id,
        pickup_date: None,
        deliverer_id: None,
        quantity: dec("50"),
        unit: "kg".to_string(),
        unit_price: dec("95.50"),
        notes: None,
    }
}

pub async fn draft_po(app: &TestApp, product_id: Uuid) -> PurchaseOrder {
    app.state
        .purchase_orders()
        .create_draft(draft_input(product_id), &app.staff)
        .await
        .unwrap()
}

pub async fn ordered_po(app: &TestApp, product_id: Uuid) -> PurchaseOrder {
    let po = draft_po(app, product_id).await;
    app.state
        .purchase_orders()
        .approve(po.id, &app.admin, Default::default())
        .await
        .unwrap()
}

pub fn line(product_id: Option<Uuid>, po_id: Option<Uuid>, quantity: &str, price: &str) -> CollectionProduct {
    CollectionProduct {
        po_id,
        product_id,
        product_name: Some("Arabica green beans".to_string()),
        expected_quantity: dec(quantity),
        unit: "kg".to_string(),
        agreed_price_per_unit: dec(price),
    }
}

/// A collection from `supplier_id` already marked collected
pub async fn collected(app: &TestApp, supplier_id: Uuid, line: CollectionProduct) -> CollectionEvent {
    let service = app.state.collections();
    let collection = service
        .create_collection(
            CreateCollectionInput {
                supplier_id,
                deliverer_id: None,
                lines: vec![line],
            },
            &app.staff,
        )
        .await
        .unwrap();
    service.mark_collected(collection.id, &app.staff).await.unwrap()
}

pub async fn stock_of(app: &TestApp, product_id: Uuid) -> Decimal {
    app.store
        .find_product(product_id)
        .await
        .unwrap()
        .unwrap()
        .stock_quantity
}
