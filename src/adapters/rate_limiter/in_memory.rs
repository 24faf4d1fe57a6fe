//! In-memory rate limiter for tests and single-server deployments.
//!
//! Keeps a sliding log of admitted request times per key. State lives in
//! the process, so limits are not shared between replicas. Keys whose log
//! has emptied are swept at most once per window, so the map only holds
//! clients seen in roughly the last two windows.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

use super::config::RateLimitConfig;

#[derive(Debug, Default)]
struct Logs {
    /// Admitted request times in unix millis, oldest first.
    by_key: HashMap<String, VecDeque<i64>>,
    last_sweep: i64,
}

impl Logs {
    fn sweep(&mut self, cutoff: i64) {
        self.by_key.retain(|_, log| {
            prune(log, cutoff);
            !log.is_empty()
        });
    }
}

fn prune(log: &mut VecDeque<i64>, cutoff: i64) {
    while log.front().is_some_and(|&t| t <= cutoff) {
        log.pop_front();
    }
}

#[derive(Debug)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    logs: Arc<RwLock<Logs>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            logs: Arc::new(RwLock::new(Logs::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    fn reset_at(oldest: Option<i64>, now: i64, window: i64) -> Timestamp {
        let reset = oldest.unwrap_or(now) + window;
        Timestamp::from_unix_millis(reset).unwrap_or_else(Timestamp::now)
    }

    async fn check_at(&self, key: RateLimitKey, now: i64) -> RateLimitResult {
        let limit = self.config.limit_for(&key);
        let window = self.config.window_millis();
        let cutoff = now - window;

        let mut logs = self.logs.write().await;
        if now - logs.last_sweep >= window {
            logs.sweep(cutoff);
            logs.last_sweep = now;
        }

        let storage_key = key.storage_key();
        let log = logs.by_key.entry(storage_key).or_default();
        prune(log, cutoff);

        if log.len() as u32 >= limit {
            let oldest = log.front().copied().unwrap_or(now);
            let wait_ms = (oldest + window - now).max(0);
            let retry_after = u32::try_from((wait_ms + 999) / 1000).unwrap_or(u32::MAX).max(1);

            return RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: retry_after,
                reset_at: Self::reset_at(Some(oldest), now, window),
                scope: key.scope,
                message: format!(
                    "Rate limit exceeded for {}. Retry after {} seconds.",
                    key.scope, retry_after
                ),
            });
        }

        log.push_back(now);
        RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(log.len() as u32),
            reset_at: Self::reset_at(log.front().copied(), now, window),
            window_secs: self.config.window_secs,
        })
    }

    async fn status_at(&self, key: RateLimitKey, now: i64) -> RateLimitStatus {
        let limit = self.config.limit_for(&key);
        let window = self.config.window_millis();
        let cutoff = now - window;

        let logs = self.logs.read().await;
        let live: Vec<i64> = logs
            .by_key
            .get(&key.storage_key())
            .map(|log| log.iter().copied().filter(|&t| t > cutoff).collect())
            .unwrap_or_default();

        RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(live.len() as u32),
            reset_at: Self::reset_at(live.first().copied(), now, window),
            window_secs: self.config.window_secs,
        }
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        Ok(self.check_at(key, Timestamp::now().as_unix_millis()).await)
    }

    async fn status(&self, key: RateLimitKey) -> Result<RateLimitStatus, RateLimitError> {
        Ok(self.status_at(key, Timestamp::now().as_unix_millis()).await)
    }

    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError> {
        self.logs.write().await.by_key.remove(&key.storage_key());
        Ok(())
    }
}
