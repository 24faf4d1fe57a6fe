//! Manual credit grants and deductions.

use std::sync::Arc;
use tracing::info;

use super::AdminError;
use crate::domain::billing::{PaymentTransaction, TransactionKind, UserCredits};
use crate::domain::foundation::{AuthenticatedUser, DomainError, ErrorCode, UserId, ValidationError};
use crate::ports::{BillingRepository, UserRepository};

#[derive(Debug, Clone)]
pub struct AdjustCreditsCommand {
    pub user_id: UserId,
    /// Positive grants, negative deducts. The balance floors at zero.
    pub amount: i64,
}

pub struct CreditAdjustmentHandler {
    users: Arc<dyn UserRepository>,
    billing: Arc<dyn BillingRepository>,
}

impl CreditAdjustmentHandler {
    pub fn new(users: Arc<dyn UserRepository>, billing: Arc<dyn BillingRepository>) -> Self {
        Self { users, billing }
    }

    pub async fn handle(
        &self,
        actor: &AuthenticatedUser,
        cmd: AdjustCreditsCommand,
    ) -> Result<UserCredits, AdminError> {
        if cmd.amount == 0 {
            return Err(ValidationError::invalid_format("amount", "must not be zero").into());
        }
        if self.users.find_by_id(&cmd.user_id).await?.is_none() {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found").into());
        }

        let credits = self.billing.adjust_credits(&cmd.user_id, cmd.amount, false).await?;
        let tx = PaymentTransaction::succeeded(
            cmd.user_id,
            TransactionKind::AdminAdjustment,
            0,
            "usd",
            cmd.amount,
            None,
        );
        self.billing.record_transaction(&tx).await?;

        info!(
            actor = %actor.id,
            user_id = %cmd.user_id,
            amount = cmd.amount,
            balance = credits.balance,
            "credits adjusted"
        );
        Ok(credits)
    }
}
