//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Google AI Studio and OpenRouter clients
//! - `auth` - JWT session validation
//! - `http` - axum REST API
//! - `memory` - In-memory repositories for tests and local runs
//! - `postgres` - sqlx repositories
//! - `rate_limiter` - Sliding-window limiters (in-memory, Redis)

pub mod ai;
pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod rate_limiter;
