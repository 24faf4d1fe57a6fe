//! ListModels query handler.

use serde::Serialize;
use std::sync::Arc;

use crate::application::{Entitlements, SettingsLoader};
use crate::config::AiConfig;
use crate::domain::catalog::{select_key, AIModel};
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{ApiKeyRepository, BillingRepository, ModelRegistry};

#[derive(Debug, Clone, Serialize)]
pub struct ModelView {
    #[serde(flatten)]
    pub model: AIModel,
    /// False when the model is gated behind a plan the user does not hold.
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderView {
    pub provider: ProviderKind,
    pub default_model: String,
    /// Whether a stored or configured key exists for the provider.
    pub configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsView {
    pub default_provider: ProviderKind,
    pub providers: Vec<ProviderView>,
    pub models: Vec<ModelView>,
}

pub struct ListModelsHandler {
    models: Arc<dyn ModelRegistry>,
    api_keys: Arc<dyn ApiKeyRepository>,
    billing: Arc<dyn BillingRepository>,
    settings: SettingsLoader,
    ai: Arc<AiConfig>,
}

impl ListModelsHandler {
    pub fn new(
        models: Arc<dyn ModelRegistry>,
        api_keys: Arc<dyn ApiKeyRepository>,
        billing: Arc<dyn BillingRepository>,
        settings: SettingsLoader,
        ai: Arc<AiConfig>,
    ) -> Self {
        Self {
            models,
            api_keys,
            billing,
            settings,
            ai,
        }
    }

    pub async fn handle(&self, user_id: &UserId) -> Result<ModelsView, DomainError> {
        let settings = self.settings.load().await?;
        let entitlements =
            Entitlements::load(self.billing.as_ref(), user_id, Timestamp::now()).await?;
        let keys = self.api_keys.list(None).await?;

        let providers = ProviderKind::ALL
            .iter()
            .map(|&provider| ProviderView {
                provider,
                default_model: self.ai.default_model(provider).to_string(),
                configured: select_key(&keys, provider).is_some()
                    || self.ai.api_key(provider).is_some(),
            })
            .collect();

        let models = self
            .models
            .list(true)
            .await?
            .into_iter()
            .map(|model| ModelView {
                available: model.is_available_to(entitlements.plan_id()),
                model,
            })
            .collect();

        Ok(ModelsView {
            default_provider: settings.default_provider,
            providers,
            models,
        })
    }
}
