//! Admin-managed catalog: model registry, provider keys and settings.

mod ai_model;
mod api_key;
pub mod settings;

pub use ai_model::{AIModel, ModelPricing, ModelUpdate};
pub use api_key::{mask_secret, select_key, ApiKey, ApiKeySummary, ApiKeyUpdate};
pub use settings::{RuntimeSettings, Setting};
