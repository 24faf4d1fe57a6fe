//! Runtime setting administration.

use std::sync::Arc;
use tracing::info;

use super::AdminError;
use crate::domain::catalog::Setting;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::SettingRepository;

pub struct SettingsAdminHandler {
    settings: Arc<dyn SettingRepository>,
}

impl SettingsAdminHandler {
    pub fn new(settings: Arc<dyn SettingRepository>) -> Self {
        Self { settings }
    }

    pub async fn list(&self) -> Result<Vec<Setting>, AdminError> {
        Ok(self.settings.list().await?)
    }

    /// Creates or replaces a setting. Known keys are type-checked.
    pub async fn upsert(&self, key: &str, value: &str) -> Result<Setting, AdminError> {
        let setting = Setting::new(key, value)?;
        self.settings.upsert(&setting).await?;
        info!(key = %setting.key, "setting updated");
        Ok(setting)
    }

    pub async fn delete(&self, key: &str) -> Result<(), AdminError> {
        if !self.settings.delete(key).await? {
            return Err(DomainError::new(
                ErrorCode::SettingNotFound,
                format!("Setting '{}' not found", key),
            )
            .into());
        }
        info!(key, "setting removed");
        Ok(())
    }
}
