//! Application layer - Commands, Queries, and Handlers.
//!
//! Handlers orchestrate domain rules over the ports. Each one owns the
//! `Arc<dyn Port>` values it needs and exposes a single `handle` method.
//!
//! - `handlers::chat` - the message pipeline and conversation queries
//! - `handlers::admin` - back-office CRUD and analytics
//! - `handlers::billing` - plan/credit queries and the Stripe webhook

mod entitlements;
pub mod handlers;
mod runtime_settings;

pub use entitlements::Entitlements;
pub use runtime_settings::SettingsLoader;
