//! In-memory API keys, settings and model registry.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::catalog::{AIModel, ApiKey, Setting};
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{ApiKeyId, DomainError, ErrorCode, ModelId, Timestamp};
use crate::ports::{ApiKeyRepository, ModelRegistry, SettingRepository};

// ════════════════════════════════════════════════════════════════════════════
// API keys
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct InMemoryApiKeyRepository {
    keys: Arc<RwLock<HashMap<ApiKeyId, ApiKey>>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key_not_found() -> DomainError {
    DomainError::new(ErrorCode::ApiKeyNotFound, "API key not found")
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn list(&self, provider: Option<ProviderKind>) -> Result<Vec<ApiKey>, DomainError> {
        let mut keys: Vec<ApiKey> = self
            .keys
            .read()
            .await
            .values()
            .filter(|k| provider.map_or(true, |p| k.provider == p))
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(keys)
    }

    async fn find(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        Ok(self.keys.read().await.get(id).cloned())
    }

    async fn create(&self, key: &ApiKey) -> Result<(), DomainError> {
        self.keys.write().await.insert(key.id, key.clone());
        Ok(())
    }

    async fn update(&self, key: &ApiKey) -> Result<(), DomainError> {
        let mut keys = self.keys.write().await;
        let existing = keys.get_mut(&key.id).ok_or_else(key_not_found)?;
        *existing = key.clone();
        Ok(())
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(self.keys.write().await.remove(id).is_some())
    }

    async fn record_use(&self, id: &ApiKeyId, at: Timestamp) -> Result<(), DomainError> {
        if let Some(key) = self.keys.write().await.get_mut(id) {
            key.usage_count += 1;
            key.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn reset_usage(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(match self.keys.write().await.get_mut(id) {
            Some(key) => {
                key.usage_count = 0;
                true
            }
            None => false,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Settings
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct InMemorySettingRepository {
    settings: Arc<RwLock<BTreeMap<String, Setting>>>,
}

impl InMemorySettingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingRepository for InMemorySettingRepository {
    async fn list(&self) -> Result<Vec<Setting>, DomainError> {
        Ok(self.settings.read().await.values().cloned().collect())
    }

    async fn upsert(&self, setting: &Setting) -> Result<(), DomainError> {
        self.settings
            .write()
            .await
            .insert(setting.key.clone(), setting.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.settings.write().await.remove(key).is_some())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Models
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct InMemoryModelRegistry {
    models: Arc<RwLock<HashMap<ModelId, AIModel>>>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_model(model: &AIModel) -> DomainError {
    DomainError::new(
        ErrorCode::AlreadyExists,
        format!("Model {}/{} already exists", model.provider, model.model_id),
    )
}

#[async_trait]
impl ModelRegistry for InMemoryModelRegistry {
    async fn list(&self, active_only: bool) -> Result<Vec<AIModel>, DomainError> {
        let mut models: Vec<AIModel> = self
            .models
            .read()
            .await
            .values()
            .filter(|m| !active_only || m.is_active)
            .cloned()
            .collect();
        models.sort_by(|a, b| {
            (a.provider, &a.display_name).cmp(&(b.provider, &b.display_name))
        });
        Ok(models)
    }

    async fn find(&self, id: &ModelId) -> Result<Option<AIModel>, DomainError> {
        Ok(self.models.read().await.get(id).cloned())
    }

    async fn find_by_name(
        &self,
        provider: ProviderKind,
        model_id: &str,
    ) -> Result<Option<AIModel>, DomainError> {
        Ok(self
            .models
            .read()
            .await
            .values()
            .find(|m| m.provider == provider && m.model_id == model_id)
            .cloned())
    }

    async fn has_models_for(&self, provider: ProviderKind) -> Result<bool, DomainError> {
        Ok(self
            .models
            .read()
            .await
            .values()
            .any(|m| m.provider == provider))
    }

    async fn create(&self, model: &AIModel) -> Result<(), DomainError> {
        let mut models = self.models.write().await;
        if models
            .values()
            .any(|m| m.provider == model.provider && m.model_id == model.model_id)
        {
            return Err(duplicate_model(model));
        }
        models.insert(model.id, model.clone());
        Ok(())
    }

    async fn update(&self, model: &AIModel) -> Result<(), DomainError> {
        let mut models = self.models.write().await;
        let taken = models.values().any(|m| {
            m.id != model.id && m.provider == model.provider && m.model_id == model.model_id
        });
        if taken {
            return Err(duplicate_model(model));
        }
        let existing = models
            .get_mut(&model.id)
            .ok_or_else(|| DomainError::new(ErrorCode::ModelNotFound, "Model not found"))?;
        *existing = model.clone();
        Ok(())
    }

    async fn delete(&self, id: &ModelId) -> Result<bool, DomainError> {
        Ok(self.models.write().await.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::ModelPricing;

    #[tokio::test]
    async fn record_use_counts_and_reset_clears() {
        let repo = InMemoryApiKeyRepository::new();
        let key = ApiKey::new(ProviderKind::Google, "primary", "AIzaSecretValue", Some(2)).unwrap();
        repo.create(&key).await.unwrap();

        repo.record_use(&key.id, Timestamp::now()).await.unwrap();
        repo.record_use(&key.id, Timestamp::now()).await.unwrap();
        let used = repo.find(&key.id).await.unwrap().unwrap();
        assert_eq!(used.usage_count, 2);
        assert!(!used.has_capacity());
        assert!(used.last_used_at.is_some());

        assert!(repo.reset_usage(&key.id).await.unwrap());
        assert_eq!(repo.find(&key.id).await.unwrap().unwrap().usage_count, 0);
        assert!(!repo.reset_usage(&ApiKeyId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_provider() {
        let repo = InMemoryApiKeyRepository::new();
        repo.create(&ApiKey::new(ProviderKind::Google, "g", "g-secret", None).unwrap())
            .await
            .unwrap();
        repo.create(&ApiKey::new(ProviderKind::OpenRouter, "o", "o-secret", None).unwrap())
            .await
            .unwrap();

        assert_eq!(repo.list(None).await.unwrap().len(), 2);
        assert_eq!(repo.list(Some(ProviderKind::OpenRouter)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settings_upsert_replaces() {
        let repo = InMemorySettingRepository::new();
        repo.upsert(&Setting::new("daily_message_limit", "10").unwrap()).await.unwrap();
        repo.upsert(&Setting::new("daily_message_limit", "20").unwrap()).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, "20");
        assert!(repo.delete("daily_message_limit").await.unwrap());
        assert!(!repo.delete("daily_message_limit").await.unwrap());
    }

    #[tokio::test]
    async fn model_pairs_are_unique() {
        let registry = InMemoryModelRegistry::new();
        let pricing = ModelPricing::new(0.1, 0.2).unwrap();
        let model = |provider: ProviderKind, name: &str| {
            AIModel::new(provider, "gemini-pro", name, pricing, 32_000, vec![]).unwrap()
        };
        registry.create(&model(ProviderKind::Google, "Gemini Pro")).await.unwrap();

        let dup = model(ProviderKind::Google, "Again");
        assert_eq!(registry.create(&dup).await.unwrap_err().code, ErrorCode::AlreadyExists);

        let other = model(ProviderKind::OpenRouter, "Routed");
        registry.create(&other).await.unwrap();

        assert!(registry.has_models_for(ProviderKind::Google).await.unwrap());
        assert!(registry
            .find_by_name(ProviderKind::OpenRouter, "gemini-pro")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn list_can_hide_inactive_models() {
        let registry = InMemoryModelRegistry::new();
        let pricing = ModelPricing::new(0.1, 0.2).unwrap();
        let mut model = AIModel::new(ProviderKind::Google, "old", "", pricing, 0, vec![]).unwrap();
        model.is_active = false;
        registry.create(&model).await.unwrap();

        assert_eq!(registry.list(false).await.unwrap().len(), 1);
        assert!(registry.list(true).await.unwrap().is_empty());
    }
}
