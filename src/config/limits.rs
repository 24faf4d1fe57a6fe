//! Request limits and chat defaults
//!
//! These are startup defaults. Values stored in the `settings` table win at
//! request time (see `domain::catalog::RuntimeSettings`).

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Sliding window length for the request rate limiter
    #[serde(default = "default_rate_window")]
    pub rate_limit_window_secs: u64,

    /// Requests per window for any API route
    #[serde(default = "default_rate_requests")]
    pub rate_limit_requests: u32,

    /// Requests per window for the chat send route
    #[serde(default = "default_chat_requests")]
    pub chat_rate_limit_requests: u32,

    /// Messages per user per UTC day when no plan overrides it
    #[serde(default = "default_daily_messages")]
    pub daily_message_limit: u32,

    /// Maximum characters in a user message
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Number of prior messages sent to the provider
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl LimitsConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rate_limit_window_secs == 0 {
            return Err(ValidationError::InvalidLimit("rate_limit_window_secs"));
        }
        if self.rate_limit_requests == 0 || self.chat_rate_limit_requests == 0 {
            return Err(ValidationError::InvalidLimit("rate_limit_requests"));
        }
        if self.max_message_length == 0 {
            return Err(ValidationError::InvalidLimit("max_message_length"));
        }
        if self.history_limit == 0 {
            return Err(ValidationError::InvalidLimit("history_limit"));
        }
        Ok(())
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_secs: default_rate_window(),
            rate_limit_requests: default_rate_requests(),
            chat_rate_limit_requests: default_chat_requests(),
            daily_message_limit: default_daily_messages(),
            max_message_length: default_max_message_length(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_rate_window() -> u64 {
    60
}

fn default_rate_requests() -> u32 {
    120
}

fn default_chat_requests() -> u32 {
    20
}

fn default_daily_messages() -> u32 {
    50
}

fn default_max_message_length() -> usize {
    10_000
}

fn default_history_limit() -> u32 {
    20
}
