//! Router tests: status codes and error bodies over HTTP

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::*;
use procurement_backend::create_app;
use procurement_backend::middleware::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, actor: Option<(Uuid, &str)>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some((id, role)) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, id.to_string())
            .header(ACTOR_ROLE_HEADER, role);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_store() {
    let app = test_app();
    let (status, body) = send(create_app(app.state.clone()), get("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["store_status"], "connected");
}

#[tokio::test]
async fn test_units_are_listed() {
    let app = test_app();
    let (status, body) = send(create_app(app.state.clone()), get("/api/v1/units")).await;

    assert_eq!(status, StatusCode::OK);
    let units = body.as_array().unwrap();
    assert!(units.iter().any(|u| u["code"] == "kg"));
}

#[tokio::test]
async fn test_missing_actor_is_unauthorized() {
    let app = test_app();
    let product = seed_product(&app, "0", "0").await;
    let body = json!({
        "supplier_id": Uuid::new_v4(),
        "product_id": product.id,
        "quantity": "5",
        "unit": "kg",
        "unit_price": "10"
    });

    let (status, body) = send(
        create_app(app.state.clone()),
        post("/api/v1/purchase-orders", None, body),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_create_and_approve_over_http() {
    let app = test_app();
    let product = seed_product(&app, "0", "0").await;
    let actor = Uuid::new_v4();
    let body = json!({
        "supplier_id": Uuid::new_v4(),
        "product_id": product.id,
        "quantity": "5",
        "unit": "kg",
        "unit_price": "10"
    });

    let (status, created) = send(
        create_app(app.state.clone()),
        post("/api/v1/purchase-orders", Some((actor, "staff")), body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");

    let po_id = created["id"].as_str().unwrap().to_string();
    let (status, approved) = send(
        create_app(app.state.clone()),
        post(&format!("/api/v1/purchase-orders/{}/approve", po_id), Some((actor, "admin")), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "ordered");

    let (status, error) = send(
        create_app(app.state.clone()),
        post(&format!("/api/v1/purchase-orders/{}/approve", po_id), Some((actor, "admin")), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["error"]["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_staff_cannot_cancel_over_http() {
    let app = test_app();
    let product = seed_product(&app, "0", "0").await;
    let po = draft_po(&app, product.id).await;

    let (status, body) = send(
        create_app(app.state.clone()),
        post(
            &format!("/api/v1/purchase-orders/{}/cancel", po.id),
            Some((Uuid::new_v4(), "staff")),
            json!({ "reason": "No longer needed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_incompatible_units_is_unprocessable() {
    let app = test_app();
    let (status, body) = send(
        create_app(app.state.clone()),
        post(
            "/api/v1/pricing/ratio",
            None,
            json!({ "purchase_unit": "kg", "selling_unit": "box", "selling_quantity": "1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INCOMPATIBLE_UNITS");
}
