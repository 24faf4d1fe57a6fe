//! Read-only dashboard aggregates.

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;

use super::AdminError;
use crate::domain::foundation::today;
use crate::ports::{AnalyticsReader, DailyUsagePoint, ModelUsage, TopUser, UsageOverview};

const DEFAULT_DAYS: u32 = 30;
const MAX_DAYS: u32 = 365;
const DEFAULT_TOP: u32 = 10;
const MAX_TOP: u32 = 100;

/// Look-back window in days, counting today.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnalyticsWindow {
    pub days: Option<u32>,
    pub limit: Option<u32>,
}

impl AnalyticsWindow {
    pub fn days(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_DAYS).clamp(1, MAX_DAYS)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_TOP).clamp(1, MAX_TOP)
    }

    /// First day of the window ending on `end`.
    pub fn start(&self, end: NaiveDate) -> NaiveDate {
        end.checked_sub_days(Days::new(u64::from(self.days() - 1)))
            .unwrap_or(NaiveDate::MIN)
    }
}

pub struct AnalyticsHandler {
    reader: Arc<dyn AnalyticsReader>,
}

impl AnalyticsHandler {
    pub fn new(reader: Arc<dyn AnalyticsReader>) -> Self {
        Self { reader }
    }

    pub async fn overview(&self) -> Result<UsageOverview, AdminError> {
        Ok(self.reader.overview(today()).await?)
    }

    pub async fn daily_usage(
        &self,
        window: AnalyticsWindow,
    ) -> Result<Vec<DailyUsagePoint>, AdminError> {
        let end = today();
        Ok(self.reader.daily_usage(window.start(end), end).await?)
    }

    pub async fn top_users(&self, window: AnalyticsWindow) -> Result<Vec<TopUser>, AdminError> {
        Ok(self.reader.top_users(window.start(today()), window.limit()).await?)
    }

    pub async fn usage_by_model(
        &self,
        window: AnalyticsWindow,
    ) -> Result<Vec<ModelUsage>, AdminError> {
        Ok(self.reader.usage_by_model(window.start(today())).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryAnalyticsReader, InMemoryConversationRepository, InMemoryUsageRepository,
        InMemoryUserRepository,
    };
    use crate::domain::account::User;
    use crate::domain::foundation::UserRole;
    use crate::domain::usage::UsageDelta;
    use crate::ports::{UsageRepository, UserRepository};

    #[test]
    fn window_defaults_and_clamps() {
        let window = AnalyticsWindow::default();
        assert_eq!(window.days(), 30);
        assert_eq!(window.limit(), 10);

        let wide = AnalyticsWindow {
            days: Some(10_000),
            limit: Some(0),
        };
        assert_eq!(wide.days(), 365);
        assert_eq!(wide.limit(), 1);
    }

    #[test]
    fn window_includes_today() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let one_day = AnalyticsWindow {
            days: Some(1),
            limit: None,
        };
        assert_eq!(one_day.start(end), end);
        let week = AnalyticsWindow {
            days: Some(7),
            limit: None,
        };
        assert_eq!(week.start(end), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[tokio::test]
    async fn daily_usage_excludes_days_outside_window() {
        let users = InMemoryUserRepository::new();
        let usage = InMemoryUsageRepository::new();
        let user = User::new("stats@example.com", None, UserRole::User).unwrap();
        users.create(&user).await.unwrap();
        let now = today();
        usage.record(&user.id, now, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();
        let long_ago = now.checked_sub_days(Days::new(40)).unwrap();
        usage.record(&user.id, long_ago, UsageDelta::exchange(1, 1, 0.0)).await.unwrap();

        let reader =
            InMemoryAnalyticsReader::new(users, InMemoryConversationRepository::new(), usage);
        let handler = AnalyticsHandler::new(Arc::new(reader));

        let series = handler.daily_usage(AnalyticsWindow::default()).await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, now);

        let top = handler
            .top_users(AnalyticsWindow {
                days: Some(365),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(top[0].messages, 2);

        let overview = handler.overview().await.unwrap();
        assert_eq!(overview.messages_today, 1);
    }
}
