//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations over the
//! ports. Grouped by audience: `chat` for signed-in users, `billing` for
//! plans, credits and Stripe, `admin` for the back-office.

pub mod admin;
pub mod billing;
pub mod chat;
