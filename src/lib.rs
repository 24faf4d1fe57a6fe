//! chat-portal - Multi-tenant AI chat back-end
//!
//! Signed-in users chat with Google AI Studio or OpenRouter models under
//! per-user daily quotas and rate limits. Administrators manage accounts,
//! provider keys, models, runtime settings and billing plans; Stripe
//! webhooks drive subscriptions and prepaid credits.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
