use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::usage::{DailyUsage, UsageDelta};

/// Per-user per-day counters.
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Counters for the day; an empty row when nothing was recorded.
    async fn get_for_day(&self, user: &UserId, date: NaiveDate) -> Result<DailyUsage, DomainError>;

    /// Adds `delta` to the (user, date) row, creating it if needed.
    ///
    /// Must be a single atomic upsert so concurrent sends never lose counts.
    async fn record(
        &self,
        user: &UserId,
        date: NaiveDate,
        delta: UsageDelta,
    ) -> Result<(), DomainError>;

    /// Counts one message against the day unless `limit` messages are
    /// already counted. Returns the new count, or `None` when the limit is
    /// reached. `limit: None` always admits.
    ///
    /// Check and increment must be one atomic step so concurrent sends can
    /// never exceed the limit.
    async fn reserve_message(
        &self,
        user: &UserId,
        date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Option<u32>, DomainError>;

    /// Returns a slot taken by `reserve_message` for a message that failed.
    async fn release_message(&self, user: &UserId, date: NaiveDate) -> Result<(), DomainError>;

    /// Rows in `[from, to]`, oldest first. Days without usage are omitted.
    async fn history(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>, DomainError>;
}
