//! User accounts.

mod user;

pub use user::{normalize_email, User, UserUpdate};
