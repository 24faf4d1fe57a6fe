//! Authentication adapters implementing the `SessionValidator` port.
//!
//! - `jwt` - HS256 tokens signed with the shared secret
//! - `mock` - fixed token table for tests

mod jwt;
mod mock;

pub use jwt::{Claims, JwtSessionValidator};
pub use mock::MockSessionValidator;
