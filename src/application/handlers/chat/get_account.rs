//! GetAccount query handler.
//!
//! Everything the UI shows about the signed-in user in one read.

use serde::Serialize;
use std::sync::Arc;

use crate::application::{Entitlements, SettingsLoader};
use crate::domain::account::User;
use crate::domain::billing::{BillingMode, SubscriptionPlan, UserCredits, UserSubscription};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::usage::{DailyQuota, DailyUsage};
use crate::ports::{BillingRepository, UsageRepository, UserRepository};

#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub user: User,
    pub usage_today: DailyUsage,
    pub quota: QuotaView,
    pub billing_mode: BillingMode,
    pub credits: UserCredits,
    pub subscription: Option<UserSubscription>,
    pub plan: Option<SubscriptionPlan>,
}

/// Quota snapshot; `limit` and `remaining` are null when unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaView {
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

impl From<DailyQuota> for QuotaView {
    fn from(quota: DailyQuota) -> Self {
        Self {
            used: quota.used,
            limit: quota.limit,
            remaining: quota.remaining(),
        }
    }
}

pub struct GetAccountHandler {
    users: Arc<dyn UserRepository>,
    usage: Arc<dyn UsageRepository>,
    billing: Arc<dyn BillingRepository>,
    settings: SettingsLoader,
}

impl GetAccountHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        usage: Arc<dyn UsageRepository>,
        billing: Arc<dyn BillingRepository>,
        settings: SettingsLoader,
    ) -> Self {
        Self {
            users,
            usage,
            billing,
            settings,
        }
    }

    pub async fn handle(&self, user_id: &UserId) -> Result<AccountView, DomainError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::UserNotFound, "User not found"))?;
        let settings = self.settings.load().await?;
        let now = Timestamp::now();

        let entitlements = Entitlements::load(self.billing.as_ref(), user_id, now).await?;
        let usage_today = self.usage.get_for_day(user_id, now.date()).await?;
        let quota = DailyQuota::new(usage_today.message_count, entitlements.daily_limit(&settings));
        let credits = self.billing.credits(user_id).await?;

        Ok(AccountView {
            user,
            usage_today,
            quota: quota.into(),
            billing_mode: settings.billing_mode,
            credits,
            subscription: entitlements.subscription,
            plan: entitlements.plan,
        })
    }
}
