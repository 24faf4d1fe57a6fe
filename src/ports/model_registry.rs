use async_trait::async_trait;

use crate::domain::catalog::AIModel;
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{DomainError, ModelId};

/// Registry of models users may select, with pricing and plan gating.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Ordered by provider then display name.
    async fn list(&self, active_only: bool) -> Result<Vec<AIModel>, DomainError>;

    async fn find(&self, id: &ModelId) -> Result<Option<AIModel>, DomainError>;

    /// Looks up by the provider's own model identifier.
    async fn find_by_name(
        &self,
        provider: ProviderKind,
        model_id: &str,
    ) -> Result<Option<AIModel>, DomainError>;

    /// Whether any model (active or not) is registered for the provider.
    ///
    /// Providers without registry entries accept any model name.
    async fn has_models_for(&self, provider: ProviderKind) -> Result<bool, DomainError>;

    /// # Errors
    ///
    /// `AlreadyExists` for a duplicate (provider, model_id).
    async fn create(&self, model: &AIModel) -> Result<(), DomainError>;

    async fn update(&self, model: &AIModel) -> Result<(), DomainError>;

    async fn delete(&self, id: &ModelId) -> Result<bool, DomainError>;
}
