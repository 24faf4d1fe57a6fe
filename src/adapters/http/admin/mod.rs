//! Back-office endpoints: users, API keys, settings, plans, models and analytics.

mod dto;
mod handlers;
mod routes;

pub use routes::admin_routes;
