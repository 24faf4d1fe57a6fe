//! Billing handlers: user-facing reads and the Stripe webhook.

mod queries;
mod webhook;

pub use queries::{BillingQueryHandler, SubscriptionView};
pub use webhook::{ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome};
