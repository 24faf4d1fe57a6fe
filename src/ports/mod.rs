//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application layer and the outside world. Adapters implement them.
//!
//! ## Identity
//!
//! - `SessionValidator` - bearer token verification
//! - `UserRepository` - account records
//!
//! ## Chat
//!
//! - `AIProvider` / `ProviderRegistry` - completion APIs
//! - `ConversationRepository` - conversations and messages
//! - `UsageRepository` - per-day counters
//! - `RateLimiter` - sliding-window request limits
//!
//! ## Administration
//!
//! - `ApiKeyRepository`, `SettingRepository`, `ModelRegistry`
//! - `BillingRepository` - plans, subscriptions, credits, transactions
//! - `AnalyticsReader` - dashboard aggregates

mod ai_provider;
mod analytics_reader;
mod api_key_repository;
mod billing_repository;
mod conversation_repository;
mod model_registry;
mod pagination;
mod rate_limiter;
mod session_validator;
mod setting_repository;
mod usage_repository;
mod user_repository;

pub use ai_provider::{
    AIError, AIProvider, CompletionRequest, CompletionResponse, FinishReason, Message,
    ProviderRegistry, TokenUsage,
};
pub use analytics_reader::{AnalyticsReader, DailyUsagePoint, ModelUsage, TopUser, UsageOverview};
pub use api_key_repository::ApiKeyRepository;
pub use billing_repository::{BillingRepository, PlanRemoval};
pub use conversation_repository::ConversationRepository;
pub use model_registry::ModelRegistry;
pub use pagination::{Page, PageRequest};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitScope,
    RateLimitStatus, RateLimiter,
};
pub use session_validator::SessionValidator;
pub use setting_repository::SettingRepository;
pub use usage_repository::UsageRepository;
pub use user_repository::UserRepository;
