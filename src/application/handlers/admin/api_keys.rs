//! Provider API key administration. Secrets never leave this module unmasked.

use std::sync::Arc;
use tracing::info;

use super::AdminError;
use crate::domain::catalog::{ApiKey, ApiKeySummary, ApiKeyUpdate};
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{ApiKeyId, DomainError, ErrorCode};
use crate::ports::ApiKeyRepository;

#[derive(Debug, Clone)]
pub struct CreateApiKeyCommand {
    pub provider: ProviderKind,
    pub name: String,
    pub secret: String,
    pub usage_limit: Option<u64>,
}

pub struct ApiKeyAdminHandler {
    keys: Arc<dyn ApiKeyRepository>,
}

fn key_not_found() -> DomainError {
    DomainError::new(ErrorCode::ApiKeyNotFound, "API key not found")
}

impl ApiKeyAdminHandler {
    pub fn new(keys: Arc<dyn ApiKeyRepository>) -> Self {
        Self { keys }
    }

    pub async fn list(
        &self,
        provider: Option<ProviderKind>,
    ) -> Result<Vec<ApiKeySummary>, AdminError> {
        let keys = self.keys.list(provider).await?;
        Ok(keys.iter().map(ApiKey::summary).collect())
    }

    pub async fn create(&self, cmd: CreateApiKeyCommand) -> Result<ApiKeySummary, AdminError> {
        let key = ApiKey::new(cmd.provider, &cmd.name, &cmd.secret, cmd.usage_limit)?;
        self.keys.create(&key).await?;
        info!(key_id = %key.id, provider = %key.provider, "api key created");
        Ok(key.summary())
    }

    pub async fn update(
        &self,
        id: &ApiKeyId,
        update: ApiKeyUpdate,
    ) -> Result<ApiKeySummary, AdminError> {
        let mut key = self.keys.find(id).await?.ok_or_else(key_not_found)?;
        key.apply(update)?;
        self.keys.update(&key).await?;
        Ok(key.summary())
    }

    pub async fn delete(&self, id: &ApiKeyId) -> Result<(), AdminError> {
        if !self.keys.delete(id).await? {
            return Err(key_not_found().into());
        }
        info!(key_id = %id, "api key deleted");
        Ok(())
    }

    pub async fn reset_usage(&self, id: &ApiKeyId) -> Result<ApiKeySummary, AdminError> {
        if !self.keys.reset_usage(id).await? {
            return Err(key_not_found().into());
        }
        let key = self.keys.find(id).await?.ok_or_else(key_not_found)?;
        Ok(key.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryApiKeyRepository;
    use crate::domain::foundation::Timestamp;

    fn command(secret: &str) -> CreateApiKeyCommand {
        CreateApiKeyCommand {
            provider: ProviderKind::OpenRouter,
            name: "Team key".into(),
            secret: secret.into(),
            usage_limit: Some(100),
        }
    }

    #[tokio::test]
    async fn created_keys_are_listed_masked() {
        let handler = ApiKeyAdminHandler::new(Arc::new(InMemoryApiKeyRepository::new()));
        let created = handler.create(command("sk-or-v1-0123456789abcdef")).await.unwrap();
        assert_eq!(created.masked_secret, "sk-o...cdef");

        let listed = handler.list(Some(ProviderKind::OpenRouter)).await.unwrap();
        assert_eq!(listed, vec![created]);
        assert!(handler.list(Some(ProviderKind::Google)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_secret_rejected() {
        let handler = ApiKeyAdminHandler::new(Arc::new(InMemoryApiKeyRepository::new()));
        assert!(handler.create(command("   ")).await.is_err());
    }

    #[tokio::test]
    async fn update_and_reset_usage() {
        let repo = InMemoryApiKeyRepository::new();
        let handler = ApiKeyAdminHandler::new(Arc::new(repo.clone()));
        let created = handler.create(command("sk-or-v1-0123456789abcdef")).await.unwrap();
        repo.record_use(&created.id, Timestamp::now()).await.unwrap();

        let updated = handler
            .update(
                &created.id,
                ApiKeyUpdate {
                    is_active: Some(false),
                    usage_limit: Some(None),
                    ..ApiKeyUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.usage_limit, None);
        assert_eq!(updated.usage_count, 1);

        let reset = handler.reset_usage(&created.id).await.unwrap();
        assert_eq!(reset.usage_count, 0);
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let handler = ApiKeyAdminHandler::new(Arc::new(InMemoryApiKeyRepository::new()));
        let id = ApiKeyId::new();
        for result in [handler.delete(&id).await.err(), handler.reset_usage(&id).await.err()] {
            assert!(matches!(
                result,
                Some(AdminError::Domain(e)) if e.code == ErrorCode::ApiKeyNotFound
            ));
        }
    }
}
