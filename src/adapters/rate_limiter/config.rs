//! Rate limit configuration types.
//!
//! Every key shares one window length. The general limit applies to keys
//! without a resource; named resources such as `chat` carry their own.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::LimitsConfig;
use crate::ports::RateLimitKey;

/// Resource name used for the chat send route.
pub const CHAT_RESOURCE: &str = "chat";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u32,
    /// Requests per window for keys without a resource.
    pub requests_per_window: u32,
    /// Per-resource overrides.
    pub resources: HashMap<String, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut resources = HashMap::new();
        resources.insert(CHAT_RESOURCE.to_string(), 20);

        Self {
            window_secs: 60,
            requests_per_window: 120,
            resources,
        }
    }
}

impl RateLimitConfig {
    pub fn from_limits(limits: &LimitsConfig) -> Self {
        let mut resources = HashMap::new();
        resources.insert(CHAT_RESOURCE.to_string(), limits.chat_rate_limit_requests);

        Self {
            window_secs: u32::try_from(limits.rate_limit_window_secs).unwrap_or(u32::MAX),
            requests_per_window: limits.rate_limit_requests,
            resources,
        }
    }

    /// Returns the limit for the key.
    pub fn limit_for(&self, key: &RateLimitKey) -> u32 {
        key.resource
            .as_deref()
            .and_then(|r| self.resources.get(r).copied())
            .unwrap_or(self.requests_per_window)
    }

    pub fn window_millis(&self) -> i64 {
        i64::from(self.window_secs) * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn resource_limit_overrides_general_limit() {
        let config = RateLimitConfig::default();
        let user = UserId::new();

        assert_eq!(config.limit_for(&RateLimitKey::user(&user)), 120);
        assert_eq!(
            config.limit_for(&RateLimitKey::user(&user).with_resource(CHAT_RESOURCE)),
            20
        );
    }

    #[test]
    fn unknown_resource_falls_back_to_general_limit() {
        let config = RateLimitConfig::default();
        let key = RateLimitKey::ip("10.0.0.1").with_resource("export");
        assert_eq!(config.limit_for(&key), 120);
    }

    #[test]
    fn built_from_limits_config() {
        let limits = LimitsConfig {
            rate_limit_window_secs: 30,
            rate_limit_requests: 10,
            chat_rate_limit_requests: 3,
            ..LimitsConfig::default()
        };
        let config = RateLimitConfig::from_limits(&limits);

        assert_eq!(config.window_secs, 30);
        assert_eq!(config.window_millis(), 30_000);
        assert_eq!(config.requests_per_window, 10);
        assert_eq!(config.resources.get(CHAT_RESOURCE), Some(&3));
    }
}
