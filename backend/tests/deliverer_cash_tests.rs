//! Deliverer cash ledger tests

mod common;

use common::*;
use procurement_backend::error::AppError;
use shared::{CashTransactionKind, LedgerReference};
use uuid::Uuid;

#[tokio::test]
async fn test_unknown_deliverer_holds_zero() {
    let app = test_app();
    let account = app.state.deliverer_cash().balance(Uuid::new_v4()).await.unwrap();
    assert_eq!(account.cash_balance, dec("0"));
}

#[tokio::test]
async fn test_replenish_and_disburse() {
    let app = test_app();
    let deliverer = Uuid::new_v4();
    let service = app.state.deliverer_cash();

    let outcome = service
        .replenish(deliverer, dec("500"), None, app.admin.id)
        .await
        .unwrap();
    assert_eq!(outcome.account.cash_balance, dec("500"));
    assert_eq!(outcome.transaction.kind, CashTransactionKind::Replenishment);

    let collection_id = Uuid::new_v4();
    let outcome = service
        .disburse(
            deliverer,
            dec("180.25"),
            Some(LedgerReference::collection(collection_id)),
            app.staff.id,
        )
        .await
        .unwrap();
    assert_eq!(outcome.account.cash_balance, dec("319.75"));
    assert_eq!(outcome.transaction.balance_after, dec("319.75"));
    assert_eq!(outcome.transaction.reference_id, Some(collection_id));

    let account = service.balance(deliverer).await.unwrap();
    assert_eq!(account.cash_balance, dec("319.75"));
}

#[tokio::test]
async fn test_balance_may_go_negative() {
    let app = test_app();
    let deliverer = Uuid::new_v4();

    let outcome = app
        .state
        .deliverer_cash()
        .disburse(deliverer, dec("40"), None, app.staff.id)
        .await
        .unwrap();
    assert_eq!(outcome.account.cash_balance, dec("-40"));
}

#[tokio::test]
async fn test_amount_must_be_positive() {
    let app = test_app();
    let service = app.state.deliverer_cash();

    for amount in ["0", "-5"] {
        let result = service
            .replenish(Uuid::new_v4(), dec(amount), None, app.admin.id)
            .await;
        match result {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "amount"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_movements_all_count() {
    let app = test_app();
    let deliverer = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..25 {
        let service = app.state.deliverer_cash();
        let actor = app.admin.id;
        handles.push(tokio::spawn(async move {
            service.replenish(deliverer, dec("10"), None, actor).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let account = app.state.deliverer_cash().balance(deliverer).await.unwrap();
    assert_eq!(account.cash_balance, dec("250"));
}
