use async_trait::async_trait;

use crate::domain::catalog::Setting;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait SettingRepository: Send + Sync {
    /// Ordered by key.
    async fn list(&self) -> Result<Vec<Setting>, DomainError>;

    /// Inserts or replaces by key.
    async fn upsert(&self, setting: &Setting) -> Result<(), DomainError>;

    async fn delete(&self, key: &str) -> Result<bool, DomainError>;
}
