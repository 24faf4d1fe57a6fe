//! HTTP adapter: axum routes, middleware and error mapping.
//!
//! - `chat` - Account, models, chat and conversations
//! - `billing` - Plans, credits, transactions and the Stripe webhook
//! - `admin` - Back office
//! - `middleware` - Authentication and rate limiting

pub mod admin;
pub mod billing;
pub mod chat;
pub mod error;
pub mod extract;
pub mod middleware;
mod router;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use router::api_router;
pub use state::AppState;
