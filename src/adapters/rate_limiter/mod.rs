//! Rate limiter adapters.
//!
//! - `InMemoryRateLimiter` - in-process, for tests and single-server setups
//! - `RedisRateLimiter` - shared across replicas
//!
//! ```ignore
//! let config = RateLimitConfig::from_limits(&app_config.limits);
//! let limiter = RedisRateLimiter::new(conn, config);
//! ```

mod config;
mod in_memory;
mod redis;

pub use config::{RateLimitConfig, CHAT_RESOURCE};
pub use in_memory::InMemoryRateLimiter;
pub use redis::RedisRateLimiter;
