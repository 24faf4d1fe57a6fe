//! Billing endpoints and the Stripe webhook.

mod handlers;
mod routes;

pub use routes::billing_routes;
