//! Deliverer cash float ledger

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_cash_amount, CashTransaction, CashTransactionKind, DelivererCashAccount,
    LedgerReference, NewCashTransaction,
};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::Store;

#[derive(Clone)]
pub struct DelivererCashService {
    store: Arc<dyn Store>,
}

/// Input for a cash movement
#[derive(Debug, Clone, Deserialize)]
pub struct CashMovementInput {
    pub amount: Decimal,
    pub reference: Option<LedgerReference>,
}

/// Account state after a movement
#[derive(Debug, Clone, Serialize)]
pub struct CashMovementOutcome {
    pub account: DelivererCashAccount,
    pub transaction: CashTransaction,
}

impl DelivererCashService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Hand cash to a deliverer
    #[instrument(skip(self))]
    pub async fn replenish(
        &self,
        deliverer_id: Uuid,
        amount: Decimal,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<CashMovementOutcome> {
        self.apply(deliverer_id, CashTransactionKind::Replenishment, amount, reference, actor_id)
            .await
    }

    /// Record cash paid out by a deliverer; the balance may go negative
    #[instrument(skip(self))]
    pub async fn disburse(
        &self,
        deliverer_id: Uuid,
        amount: Decimal,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<CashMovementOutcome> {
        self.apply(deliverer_id, CashTransactionKind::Disbursement, amount, reference, actor_id)
            .await
    }

    /// Current account; a deliverer without movements holds zero
    pub async fn balance(&self, deliverer_id: Uuid) -> AppResult<DelivererCashAccount> {
        Ok(self
            .store
            .find_cash_account(deliverer_id)
            .await?
            .unwrap_or_else(|| DelivererCashAccount {
                deliverer_id,
                cash_balance: Decimal::ZERO,
                updated_at: chrono::Utc::now(),
            }))
    }

    async fn apply(
        &self,
        deliverer_id: Uuid,
        kind: CashTransactionKind,
        amount: Decimal,
        reference: Option<LedgerReference>,
        actor_id: Uuid,
    ) -> AppResult<CashMovementOutcome> {
        validate_cash_amount(amount).map_err(|m| AppError::validation("amount", m))?;

        let (account, transaction) = self
            .store
            .apply_cash_transaction(NewCashTransaction {
                deliverer_id,
                kind,
                amount,
                reference,
                performed_by: actor_id,
            })
            .await?;

        tracing::info!(
            deliverer_id = %deliverer_id,
            kind = kind.as_str(),
            amount = %transaction.amount,
            balance = %account.cash_balance,
            "Deliverer cash movement recorded"
        );
        if account.cash_balance < Decimal::ZERO {
            tracing::warn!(deliverer_id = %deliverer_id, balance = %account.cash_balance, "Deliverer cash balance is negative");
        }

        Ok(CashMovementOutcome {
            account,
            transaction,
        })
    }
}
