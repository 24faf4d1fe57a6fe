//! Back-office handlers. Callers are expected to have passed the admin gate.

mod analytics;
mod api_keys;
mod credits;
mod models;
mod plans;
mod settings;
mod users;

use thiserror::Error;

use crate::domain::foundation::{DomainError, ValidationError};

pub use analytics::{AnalyticsHandler, AnalyticsWindow};
pub use api_keys::{ApiKeyAdminHandler, CreateApiKeyCommand};
pub use credits::{AdjustCreditsCommand, CreditAdjustmentHandler};
pub use models::{CreateModelCommand, ModelAdminHandler};
pub use plans::PlanAdminHandler;
pub use settings::SettingsAdminHandler;
pub use users::{CreateUserCommand, UserAdminHandler, UserDetail};

#[derive(Debug, Error)]
pub enum AdminError {
    /// An admin tried to delete, demote or deactivate their own account.
    #[error("Admins cannot {0} their own account")]
    SelfModification(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<ValidationError> for AdminError {
    fn from(err: ValidationError) -> Self {
        AdminError::Domain(err.into())
    }
}
