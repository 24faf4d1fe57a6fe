//! Redis-backed rate limiter for multi-server deployments.
//!
//! Each key is a sorted set of admitted request times scored in unix
//! millis. A check runs as one Lua script, so pruning, counting and adding
//! are a single atomic step and racing replicas cannot overshoot the limit:
//!
//! 1. ZREMRANGEBYSCORE drops entries older than the window
//! 2. ZCARD counts what remains
//! 3. ZRANGE 0 0 WITHSCORES fetches the oldest entry
//! 4. Under the limit, ZADD records the request and PEXPIRE refreshes the key
//!
//! Status reads run steps 1 to 3 as a MULTI/EXEC pipeline.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Script;
use uuid::Uuid;

use crate::domain::foundation::Timestamp;
use crate::ports::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus, RateLimiter,
};

use super::config::RateLimitConfig;

/// Returns `{admitted, count, oldest}`; `count` includes an admitted request.
const CHECK_SCRIPT: &str = r#"
local key = KEYS[1]
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now - window)
local count = redis.call('ZCARD', key)
local first = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
local oldest = now
if first[2] then
    oldest = tonumber(first[2])
end

if count >= limit then
    return {0, count, oldest}
end

redis.call('ZADD', key, now, ARGV[4])
redis.call('PEXPIRE', key, window)
return {1, count + 1, oldest}
"#;

#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: MultiplexedConnection,
    config: RateLimitConfig,
    check_script: Script,
}

fn unavailable(e: redis::RedisError) -> RateLimitError {
    RateLimitError::Unavailable(e.to_string())
}

impl RedisRateLimiter {
    pub fn new(conn: MultiplexedConnection, config: RateLimitConfig) -> Self {
        Self {
            conn,
            config,
            check_script: Script::new(CHECK_SCRIPT),
        }
    }

    /// Prunes the window and returns (count, oldest score).
    async fn window_state(
        &self,
        storage_key: &str,
        now: i64,
    ) -> Result<(u32, Option<i64>), RateLimitError> {
        let cutoff = now - self.config.window_millis();
        let mut conn = self.conn.clone();

        let (count, oldest): (u32, Vec<(String, i64)>) = redis::pipe()
            .atomic()
            .cmd("ZREMRANGEBYSCORE")
            .arg(storage_key)
            .arg("-inf")
            .arg(cutoff)
            .ignore()
            .cmd("ZCARD")
            .arg(storage_key)
            .cmd("ZRANGE")
            .arg(storage_key)
            .arg(0)
            .arg(0)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        Ok((count, oldest.first().map(|(_, score)| *score)))
    }

    fn reset_at(&self, oldest: Option<i64>, now: i64) -> Timestamp {
        let reset = oldest.unwrap_or(now) + self.config.window_millis();
        Timestamp::from_unix_millis(reset).unwrap_or_else(Timestamp::now)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError> {
        let storage_key = key.storage_key();
        let limit = self.config.limit_for(&key);
        let window = self.config.window_millis();
        let now = Timestamp::now().as_unix_millis();

        // Members must be unique even when two requests share a millisecond.
        let member = format!("{}-{}", now, Uuid::new_v4().simple());
        let mut conn = self.conn.clone();
        let (admitted, count, oldest): (u8, u32, i64) = self
            .check_script
            .key(&storage_key)
            .arg(now)
            .arg(window)
            .arg(limit)
            .arg(member)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        if admitted == 0 {
            let wait_ms = (oldest + window - now).max(0);
            let retry_after = u32::try_from((wait_ms + 999) / 1000).unwrap_or(u32::MAX).max(1);

            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: retry_after,
                reset_at: self.reset_at(Some(oldest), now),
                scope: key.scope,
                message: format!(
                    "Rate limit exceeded for {}. Retry after {} seconds.",
                    key.scope, retry_after
                ),
            }));
        }

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: self.reset_at(Some(oldest), now),
            window_secs: self.config.window_secs,
        }))
    }

    async fn status(&self, key: RateLimitKey) -> Result<RateLimitStatus, RateLimitError> {
        let limit = self.config.limit_for(&key);
        let now = Timestamp::now().as_unix_millis();
        let (count, oldest) = self.window_state(&key.storage_key(), now).await?;

        Ok(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(count),
            reset_at: self.reset_at(oldest, now),
            window_secs: self.config.window_secs,
        })
    }

    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(key.storage_key())
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
