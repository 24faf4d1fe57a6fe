//! Plans, subscriptions, prepaid credits and Stripe webhook handling.

mod credits;
mod plan;
pub mod stripe_event;
mod subscription;
mod webhook_errors;
mod webhook_verifier;

pub use credits::{PaymentTransaction, TransactionKind, TransactionStatus, UserCredits};
pub use plan::{BillingInterval, BillingMode, PlanDraft, SubscriptionPlan};
pub use stripe_event::{CheckoutSession, Invoice, StripeEvent, StripeEventType, SubscriptionObject};
pub use subscription::{SubscriptionStatus, UserSubscription};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier};

#[cfg(test)]
pub use webhook_verifier::sign_for_test;
