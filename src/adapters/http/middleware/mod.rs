//! HTTP middleware for axum.
//!
//! - `auth` - Authentication middleware and extractors
//! - `rate_limit` - Sliding-window request limits

pub mod auth;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthRejection, AuthState, RequireAdmin, RequireAuth};
pub use rate_limit::{chat_rate_limit_middleware, rate_limit_middleware, RateLimiterState};
