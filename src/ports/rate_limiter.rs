//! Rate limiting port.
//!
//! Limits are enforced with a sliding-window log: every admitted request's
//! timestamp is kept until it falls out of the window, and a request is
//! admitted while fewer than `limit` timestamps remain.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserId};

/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Admits and records the request, or denies it with a retry hint.
    async fn check(&self, key: RateLimitKey) -> Result<RateLimitResult, RateLimitError>;

    /// Current status without recording a request.
    async fn status(&self, key: RateLimitKey) -> Result<RateLimitStatus, RateLimitError>;

    /// Forgets all recorded requests for the key.
    async fn reset(&self, key: RateLimitKey) -> Result<(), RateLimitError>;
}

/// Identity a window is kept for.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    pub scope: RateLimitScope,
    /// IP address or user id
    pub identifier: String,
    /// Narrower limit for one route family, e.g. `chat`
    pub resource: Option<String>,
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    Ip,
    User,
}

impl RateLimitKey {
    pub fn ip(ip: &str) -> Self {
        Self {
            scope: RateLimitScope::Ip,
            identifier: ip.to_string(),
            resource: None,
        }
    }

    pub fn user(user_id: &UserId) -> Self {
        Self {
            scope: RateLimitScope::User,
            identifier: user_id.to_string(),
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_string());
        self
    }

    /// Flat key used by the storage backends.
    pub fn storage_key(&self) -> String {
        match &self.resource {
            Some(resource) => format!(
                "ratelimit:{}:{}:{}",
                self.scope.as_str(),
                self.identifier,
                resource
            ),
            None => format!("ratelimit:{}:{}", self.scope.as_str(), self.identifier),
        }
    }
}

impl RateLimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitScope::Ip => "ip",
            RateLimitScope::User => "user",
        }
    }
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum RateLimitResult {
    Allowed(RateLimitStatus),
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// When the oldest recorded request leaves the window
    pub reset_at: Timestamp,
    pub window_secs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitDenied {
    pub limit: u32,
    /// At least 1
    pub retry_after_secs: u32,
    /// When the oldest recorded request leaves the window
    pub reset_at: Timestamp,
    pub scope: RateLimitScope,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys() {
        assert_eq!(RateLimitKey::ip("10.0.0.1").storage_key(), "ratelimit:ip:10.0.0.1");

        let user = UserId::new();
        assert_eq!(
            RateLimitKey::user(&user).with_resource("chat").storage_key(),
            format!("ratelimit:user:{}:chat", user)
        );
    }

    #[test]
    fn resource_keys_are_distinct() {
        let user = UserId::new();
        assert_ne!(RateLimitKey::user(&user), RateLimitKey::user(&user).with_resource("chat"));
    }
}
