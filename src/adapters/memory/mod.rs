//! In-memory implementations of the repository ports.
//!
//! Backing stores for handler and HTTP tests. Each store is cheap to clone
//! and clones share state.

mod analytics;
mod billing;
mod catalog;
mod conversations;
mod usage;
mod users;

pub use analytics::InMemoryAnalyticsReader;
pub use billing::InMemoryBillingRepository;
pub use catalog::{InMemoryApiKeyRepository, InMemoryModelRegistry, InMemorySettingRepository};
pub use conversations::InMemoryConversationRepository;
pub use usage::InMemoryUsageRepository;
pub use users::InMemoryUserRepository;
