//! Read-only aggregates for the admin dashboard.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{DomainError, UserId};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageOverview {
    pub total_users: u64,
    pub active_users: u64,
    /// Users who sent at least one message today
    pub users_active_today: u64,
    pub total_conversations: u64,
    pub total_messages: u64,
    pub messages_today: u64,
    pub tokens_today: u64,
    pub cost_today_usd: f64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyUsagePoint {
    pub date: NaiveDate,
    pub messages: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
    pub active_users: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopUser {
    pub user_id: UserId,
    pub email: String,
    pub messages: u64,
    pub tokens: u64,
    pub cost_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelUsage {
    pub provider: ProviderKind,
    pub model: String,
    pub messages: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

#[async_trait]
pub trait AnalyticsReader: Send + Sync {
    async fn overview(&self, today: NaiveDate) -> Result<UsageOverview, DomainError>;

    /// One point per day in `[from, to]` that has usage, oldest first.
    async fn daily_usage(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsagePoint>, DomainError>;

    /// By message count since `from`, descending.
    async fn top_users(&self, from: NaiveDate, limit: u32) -> Result<Vec<TopUser>, DomainError>;

    /// Assistant replies since `from`, grouped by the conversation's
    /// provider and model. Most used first.
    async fn usage_by_model(&self, from: NaiveDate) -> Result<Vec<ModelUsage>, DomainError>;
}
