//! In-memory daily usage counters.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::usage::{DailyQuota, DailyUsage, UsageDelta};
use crate::ports::UsageRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryUsageRepository {
    days: Arc<RwLock<HashMap<(UserId, NaiveDate), DailyUsage>>>,
}

impl InMemoryUsageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn all(&self) -> Vec<DailyUsage> {
        self.days.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn get_for_day(&self, user: &UserId, date: NaiveDate) -> Result<DailyUsage, DomainError> {
        Ok(self
            .days
            .read()
            .await
            .get(&(*user, date))
            .cloned()
            .unwrap_or_else(|| DailyUsage::empty(*user, date)))
    }

    async fn record(
        &self,
        user: &UserId,
        date: NaiveDate,
        delta: UsageDelta,
    ) -> Result<(), DomainError> {
        self.days
            .write()
            .await
            .entry((*user, date))
            .or_insert_with(|| DailyUsage::empty(*user, date))
            .add(&delta);
        Ok(())
    }

    async fn reserve_message(
        &self,
        user: &UserId,
        date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Option<u32>, DomainError> {
        let mut days = self.days.write().await;
        let row = days
            .entry((*user, date))
            .or_insert_with(|| DailyUsage::empty(*user, date));
        if DailyQuota::new(row.message_count, limit).is_exhausted() {
            return Ok(None);
        }
        row.message_count += 1;
        Ok(Some(row.message_count))
    }

    async fn release_message(&self, user: &UserId, date: NaiveDate) -> Result<(), DomainError> {
        if let Some(row) = self.days.write().await.get_mut(&(*user, date)) {
            row.message_count = row.message_count.saturating_sub(1);
        }
        Ok(())
    }

    async fn history(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>, DomainError> {
        let mut days: Vec<DailyUsage> = self
            .days
            .read()
            .await
            .values()
            .filter(|d| &d.user_id == user && d.date >= from && d.date <= to)
            .cloned()
            .collect();
        days.sort_by_key(|d| d.date);
        Ok(days)
    }
}
