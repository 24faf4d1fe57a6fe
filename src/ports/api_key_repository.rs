use async_trait::async_trait;

use crate::domain::catalog::ApiKey;
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{ApiKeyId, DomainError, Timestamp};

/// Admin-managed provider credentials.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// All keys, optionally for one provider.
    async fn list(&self, provider: Option<ProviderKind>) -> Result<Vec<ApiKey>, DomainError>;

    async fn find(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    async fn create(&self, key: &ApiKey) -> Result<(), DomainError>;

    /// Persists name, active flag and usage limit.
    async fn update(&self, key: &ApiKey) -> Result<(), DomainError>;

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    /// Increments `usage_count` and stamps `last_used_at`.
    async fn record_use(&self, id: &ApiKeyId, at: Timestamp) -> Result<(), DomainError>;

    async fn reset_usage(&self, id: &ApiKeyId) -> Result<bool, DomainError>;
}
