//! Loads the effective runtime settings for a request.

use std::sync::Arc;

use crate::config::LimitsConfig;
use crate::domain::catalog::RuntimeSettings;
use crate::domain::foundation::DomainError;
use crate::ports::SettingRepository;

/// Config-file limits overlaid with whatever admins stored.
///
/// Settings are re-read on every call so admin edits apply immediately.
#[derive(Clone)]
pub struct SettingsLoader {
    repository: Arc<dyn SettingRepository>,
    defaults: RuntimeSettings,
}

impl SettingsLoader {
    pub fn new(repository: Arc<dyn SettingRepository>, limits: &LimitsConfig) -> Self {
        let defaults = RuntimeSettings {
            daily_message_limit: limits.daily_message_limit,
            max_message_length: limits.max_message_length,
            history_limit: limits.history_limit,
            ..RuntimeSettings::default()
        };
        Self { repository, defaults }
    }

    pub fn with_defaults(
        repository: Arc<dyn SettingRepository>,
        defaults: RuntimeSettings,
    ) -> Self {
        Self { repository, defaults }
    }

    pub async fn load(&self) -> Result<RuntimeSettings, DomainError> {
        let stored = self.repository.list().await?;
        Ok(self.defaults.clone().overlay(&stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemorySettingRepository;
    use crate::domain::billing::BillingMode;
    use crate::domain::catalog::Setting;

    #[tokio::test]
    async fn config_limits_are_the_defaults() {
        let limits = LimitsConfig {
            daily_message_limit: 7,
            max_message_length: 300,
            history_limit: 4,
            ..LimitsConfig::default()
        };
        let loader = SettingsLoader::new(Arc::new(InMemorySettingRepository::new()), &limits);

        let settings = loader.load().await.unwrap();
        assert_eq!(settings.daily_message_limit, 7);
        assert_eq!(settings.max_message_length, 300);
        assert_eq!(settings.history_limit, 4);
        assert_eq!(settings.billing_mode, BillingMode::Disabled);
    }

    #[tokio::test]
    async fn stored_settings_override_defaults() {
        let repo = InMemorySettingRepository::new();
        repo.upsert(&Setting::new("daily_message_limit", "3").unwrap()).await.unwrap();
        repo.upsert(&Setting::new("billing_mode", "credits").unwrap()).await.unwrap();
        let loader = SettingsLoader::new(Arc::new(repo.clone()), &LimitsConfig::default());

        let settings = loader.load().await.unwrap();
        assert_eq!(settings.daily_message_limit, 3);
        assert_eq!(settings.billing_mode, BillingMode::Credits);

        repo.delete("daily_message_limit").await.unwrap();
        let settings = loader.load().await.unwrap();
        assert_eq!(settings.daily_message_limit, LimitsConfig::default().daily_message_limit);
    }
}
