//! Deliverer cash ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stock::LedgerReference;
use super::ReferenceType;
use crate::error::UnknownVariant;

/// Cash float held by a deliverer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelivererCashAccount {
    pub deliverer_id: Uuid,
    pub cash_balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Kinds of cash movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashTransactionKind {
    /// Cash handed to the deliverer
    Replenishment,
    /// Cash paid out by the deliverer (e.g., to a supplier)
    Disbursement,
}

impl CashTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashTransactionKind::Replenishment => "replenishment",
            CashTransactionKind::Disbursement => "disbursement",
        }
    }

    /// Signed balance delta for a positive amount
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            CashTransactionKind::Replenishment => amount,
            CashTransactionKind::Disbursement => -amount,
        }
    }
}

impl std::str::FromStr for CashTransactionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replenishment" => Ok(CashTransactionKind::Replenishment),
            "disbursement" => Ok(CashTransactionKind::Disbursement),
            other => Err(UnknownVariant::new("cash transaction kind", other)),
        }
    }
}

/// Immutable record of a cash movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashTransaction {
    pub id: Uuid,
    pub deliverer_id: Uuid,
    /// Signed amount applied to the balance
    pub amount: Decimal,
    pub kind: CashTransactionKind,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<ReferenceType>,
    pub balance_after: Decimal,
    pub performed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A cash movement about to be applied
#[derive(Debug, Clone, PartialEq)]
pub struct NewCashTransaction {
    pub deliverer_id: Uuid,
    pub kind: CashTransactionKind,
    /// Positive amount; the sign comes from `kind`
    pub amount: Decimal,
    pub reference: Option<LedgerReference>,
    pub performed_by: Uuid,
}

impl NewCashTransaction {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}
