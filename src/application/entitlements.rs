//! What a user's subscription currently entitles them to.

use crate::domain::billing::{SubscriptionPlan, UserSubscription};
use crate::domain::catalog::RuntimeSettings;
use crate::domain::foundation::{DomainError, PlanId, Timestamp, UserId};
use crate::ports::BillingRepository;

#[derive(Debug, Clone, Default)]
pub struct Entitlements {
    pub subscription: Option<UserSubscription>,
    pub plan: Option<SubscriptionPlan>,
}

impl Entitlements {
    pub async fn load(
        billing: &dyn BillingRepository,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Self, DomainError> {
        let subscription = billing.current_subscription(user, now).await?;
        let plan = match &subscription {
            Some(sub) => billing.find_plan(&sub.plan_id).await?,
            None => None,
        };
        Ok(Self { subscription, plan })
    }

    pub fn plan_id(&self) -> Option<&PlanId> {
        self.subscription.as_ref().map(|s| &s.plan_id)
    }

    /// Daily message cap, `None` for unlimited.
    ///
    /// A plan without a limit (or a limit of 0) is unlimited. Without a plan
    /// the `daily_message_limit` setting applies as-is, so 0 blocks.
    pub fn daily_limit(&self, settings: &RuntimeSettings) -> Option<u32> {
        match &self.plan {
            Some(plan) => plan.daily_message_limit.filter(|limit| *limit > 0),
            None => Some(settings.daily_message_limit),
        }
    }
}
