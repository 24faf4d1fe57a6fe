//! Per-user daily usage accounting.
//!
//! One row per (user, UTC date). Rows are only ever grown by adding a
//! [`UsageDelta`], never overwritten.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// Aggregate counters for one user on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub message_count: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl DailyUsage {
    /// A day with nothing recorded yet.
    pub fn empty(user_id: UserId, date: NaiveDate) -> Self {
        Self {
            user_id,
            date,
            message_count: 0,
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_usd: 0.0,
        }
    }

    pub fn add(&mut self, delta: &UsageDelta) {
        self.message_count += delta.messages;
        self.prompt_tokens += u64::from(delta.prompt_tokens);
        self.completion_tokens += u64::from(delta.completion_tokens);
        self.cost_usd += delta.cost_usd;
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Increment applied to a day's counters after a completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UsageDelta {
    pub messages: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
}

impl UsageDelta {
    /// One message exchange.
    pub fn exchange(prompt_tokens: u32, completion_tokens: u32, cost_usd: f64) -> Self {
        Self {
            messages: 1,
            prompt_tokens,
            completion_tokens,
            cost_usd,
        }
    }

    /// Tokens and cost of an exchange whose message was already counted by
    /// a reservation.
    pub fn tokens(prompt_tokens: u32, completion_tokens: u32, cost_usd: f64) -> Self {
        Self {
            messages: 0,
            ..Self::exchange(prompt_tokens, completion_tokens, cost_usd)
        }
    }
}

/// Daily message allowance for a user.
///
/// `limit: None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuota {
    pub used: u32,
    pub limit: Option<u32>,
}

impl DailyQuota {
    pub fn new(used: u32, limit: Option<u32>) -> Self {
        Self { used, limit }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.limit, Some(limit) if self.used >= limit)
    }

    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }
}
