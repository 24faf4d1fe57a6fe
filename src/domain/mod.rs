//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, auth types, errors)
//! - `account` - User accounts and admin edits
//! - `chat` - Conversations, messages, providers
//! - `usage` - Per-user daily counters and quota
//! - `catalog` - Model registry, provider keys, runtime settings
//! - `billing` - Plans, subscriptions, credits, Stripe webhooks

pub mod account;
pub mod billing;
pub mod catalog;
pub mod chat;
pub mod foundation;
pub mod usage;
