use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::plan::SubscriptionPlan;
use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    /// Renewal payment failed; access continues until the period ends.
    PastDue,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "cancelled" | "canceled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(format!("unknown subscription status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub status: SubscriptionStatus,
    pub stripe_subscription_id: Option<String>,
    pub current_period_start: Timestamp,
    pub current_period_end: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserSubscription {
    /// Starts a subscription covering one billing period from `now`.
    pub fn activate(
        user_id: UserId,
        plan: &SubscriptionPlan,
        stripe_subscription_id: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            stripe_subscription_id,
            current_period_start: now,
            current_period_end: plan.interval.period_end(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the subscription grants plan benefits at `now`.
    pub fn is_current(&self, now: &Timestamp) -> bool {
        matches!(self.status, SubscriptionStatus::Active | SubscriptionStatus::PastDue)
            && now.is_before(&self.current_period_end)
    }

    /// Extends into the next period after a successful renewal.
    pub fn renew(&mut self, plan: &SubscriptionPlan, now: Timestamp) {
        let start = if self.current_period_end.is_after(&now) {
            self.current_period_end
        } else {
            now
        };
        self.current_period_start = start;
        self.current_period_end = plan.interval.period_end(start);
        self.status = SubscriptionStatus::Active;
        self.updated_at = now;
    }

    pub fn mark_past_due(&mut self, now: Timestamp) {
        if self.status == SubscriptionStatus::Active {
            self.status = SubscriptionStatus::PastDue;
            self.updated_at = now;
        }
    }

    pub fn cancel(&mut self, now: Timestamp) {
        self.status = SubscriptionStatus::Cancelled;
        self.updated_at = now;
    }
}
