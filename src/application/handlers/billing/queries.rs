//! Billing read models for the signed-in user.

use serde::Serialize;
use std::sync::Arc;

use crate::application::{Entitlements, SettingsLoader};
use crate::domain::billing::{
    BillingMode, PaymentTransaction, SubscriptionPlan, UserCredits, UserSubscription,
};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::BillingRepository;

const DEFAULT_HISTORY: u32 = 50;
const MAX_HISTORY: u32 = 100;

/// Current subscription with the plan it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub billing_mode: BillingMode,
    pub subscription: Option<UserSubscription>,
    pub plan: Option<SubscriptionPlan>,
}

pub struct BillingQueryHandler {
    billing: Arc<dyn BillingRepository>,
    settings: SettingsLoader,
}

impl BillingQueryHandler {
    pub fn new(billing: Arc<dyn BillingRepository>, settings: SettingsLoader) -> Self {
        Self { billing, settings }
    }

    /// Plans open for purchase.
    pub async fn plans(&self) -> Result<Vec<SubscriptionPlan>, DomainError> {
        self.billing.list_plans(true).await
    }

    pub async fn subscription(&self, user_id: &UserId) -> Result<SubscriptionView, DomainError> {
        let settings = self.settings.load().await?;
        let entitlements =
            Entitlements::load(self.billing.as_ref(), user_id, Timestamp::now()).await?;
        Ok(SubscriptionView {
            billing_mode: settings.billing_mode,
            subscription: entitlements.subscription,
            plan: entitlements.plan,
        })
    }

    pub async fn credits(&self, user_id: &UserId) -> Result<UserCredits, DomainError> {
        self.billing.credits(user_id).await
    }

    /// Newest first; `limit` defaults to 50 and is capped at 100.
    pub async fn transactions(
        &self,
        user_id: &UserId,
        limit: Option<u32>,
    ) -> Result<Vec<PaymentTransaction>, DomainError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY).clamp(1, MAX_HISTORY);
        self.billing.list_transactions(user_id, limit).await
    }
}
