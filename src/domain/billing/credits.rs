use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, TransactionId, UserId};

/// Prepaid message balance, one row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCredits {
    pub user_id: UserId,
    pub balance: i64,
    pub lifetime_purchased: i64,
    pub updated_at: Timestamp,
}

impl UserCredits {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: 0,
            lifetime_purchased: 0,
            updated_at: Timestamp::now(),
        }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.balance >= i64::from(cost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Subscription,
    Renewal,
    CreditPurchase,
    AdminAdjustment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Subscription => "subscription",
            TransactionKind::Renewal => "renewal",
            TransactionKind::CreditPurchase => "credit_purchase",
            TransactionKind::AdminAdjustment => "admin_adjustment",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subscription" => Ok(TransactionKind::Subscription),
            "renewal" => Ok(TransactionKind::Renewal),
            "credit_purchase" => Ok(TransactionKind::CreditPurchase),
            "admin_adjustment" => Ok(TransactionKind::AdminAdjustment),
            other => Err(format!("unknown transaction kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Succeeded,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Succeeded => "succeeded",
            TransactionStatus::Failed => "failed",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "succeeded" => Ok(TransactionStatus::Succeeded),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// Money or credit movement recorded for a user.
///
/// `stripe_reference` is unique when present and makes webhook processing
/// idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount_cents: i64,
    pub currency: String,
    pub credits: i64,
    pub status: TransactionStatus,
    pub stripe_reference: Option<String>,
    pub created_at: Timestamp,
}

impl PaymentTransaction {
    pub fn succeeded(
        user_id: UserId,
        kind: TransactionKind,
        amount_cents: i64,
        currency: impl Into<String>,
        credits: i64,
        stripe_reference: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            kind,
            amount_cents,
            currency: currency.into(),
            credits,
            status: TransactionStatus::Succeeded,
            stripe_reference,
            created_at: Timestamp::now(),
        }
    }
}
