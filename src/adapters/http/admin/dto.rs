//! Request bodies for the admin endpoints.
//!
//! Optional fields left out of an update leave the stored value unchanged.
//! For nullable fields, an explicit `null` clears the value.

use serde::{Deserialize, Deserializer};

use crate::application::handlers::admin::{
    CreateApiKeyCommand, CreateModelCommand, CreateUserCommand,
};
use crate::domain::account::UserUpdate;
use crate::domain::catalog::{ApiKeyUpdate, ModelPricing, ModelUpdate};
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{PlanId, UserRole, ValidationError};
use crate::ports::PageRequest;

/// Distinguishes a missing field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ════════════════════════════════════════════════════════════════════════════════
// Users
// ════════════════════════════════════════════════════════════════════════════════

/// Query string for the user list. Paging fields are inlined because
/// `serde(flatten)` loses numeric types in query strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

impl UserListQuery {
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }

    /// Blank searches are treated as absent.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: UserRole,
}

impl From<CreateUserRequest> for CreateUserCommand {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            email: req.email,
            display_name: req.display_name,
            role: req.role,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub display_name: Option<Option<String>>,
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            display_name: req.display_name,
            role: req.role,
            is_active: req.is_active,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustCreditsRequest {
    /// Positive grants, negative deducts.
    pub amount: i64,
}

// ════════════════════════════════════════════════════════════════════════════════
// API keys
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyListQuery {
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApiKeyRequest {
    pub provider: ProviderKind,
    pub name: String,
    pub secret: String,
    #[serde(default)]
    pub usage_limit: Option<u64>,
}

impl From<CreateApiKeyRequest> for CreateApiKeyCommand {
    fn from(req: CreateApiKeyRequest) -> Self {
        Self {
            provider: req.provider,
            name: req.name,
            secret: req.secret,
            usage_limit: req.usage_limit,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub secret: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub usage_limit: Option<Option<u64>>,
}

impl From<UpdateApiKeyRequest> for ApiKeyUpdate {
    fn from(req: UpdateApiKeyRequest) -> Self {
        Self {
            name: req.name,
            secret: req.secret,
            is_active: req.is_active,
            usage_limit: req.usage_limit,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Settings
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertSettingRequest {
    pub value: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Models
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PricingRequest {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl TryFrom<PricingRequest> for ModelPricing {
    type Error = ValidationError;

    fn try_from(req: PricingRequest) -> Result<Self, Self::Error> {
        ModelPricing::new(req.input_per_million, req.output_per_million)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateModelRequest {
    pub provider: ProviderKind,
    pub model_id: String,
    #[serde(default)]
    pub display_name: String,
    pub pricing: PricingRequest,
    #[serde(default)]
    pub context_window: u32,
    #[serde(default)]
    pub plan_ids: Vec<PlanId>,
}

impl TryFrom<CreateModelRequest> for CreateModelCommand {
    type Error = ValidationError;

    fn try_from(req: CreateModelRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            provider: req.provider,
            model_id: req.model_id,
            display_name: req.display_name,
            pricing: req.pricing.try_into()?,
            context_window: req.context_window,
            plan_ids: req.plan_ids,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateModelRequest {
    pub display_name: Option<String>,
    pub pricing: Option<PricingRequest>,
    pub context_window: Option<u32>,
    pub plan_ids: Option<Vec<PlanId>>,
    pub is_active: Option<bool>,
}

impl TryFrom<UpdateModelRequest> for ModelUpdate {
    type Error = ValidationError;

    fn try_from(req: UpdateModelRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            display_name: req.display_name,
            pricing: req.pricing.map(ModelPricing::try_from).transpose()?,
            context_window: req.context_window,
            plan_ids: req.plan_ids,
            is_active: req.is_active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_update_distinguishes_null_from_missing() {
        let missing: UpdateUserRequest = serde_json::from_str(r#"{"is_active":false}"#).unwrap();
        assert_eq!(missing.display_name, None);
        assert_eq!(missing.is_active, Some(false));

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"display_name":null}"#).unwrap();
        assert_eq!(cleared.display_name, Some(None));

        let set: UpdateUserRequest =
            serde_json::from_str(r#"{"display_name":"Ann","role":"admin"}"#).unwrap();
        assert_eq!(set.display_name, Some(Some("Ann".into())));
        assert_eq!(set.role, Some(UserRole::Admin));
    }

    #[test]
    fn api_key_usage_limit_can_be_removed() {
        let req: UpdateApiKeyRequest = serde_json::from_str(r#"{"usage_limit":null}"#).unwrap();
        assert_eq!(ApiKeyUpdate::from(req).usage_limit, Some(None));
    }

    #[test]
    fn model_pricing_is_validated() {
        let req: UpdateModelRequest = serde_json::from_value(json!({
            "pricing": { "input_per_million": -1, "output_per_million": 2 }
        }))
        .unwrap();
        assert!(ModelUpdate::try_from(req).is_err());

        let req: CreateModelRequest = serde_json::from_value(json!({
            "provider": "google",
            "model_id": "gemini-pro",
            "pricing": { "input_per_million": 0.5, "output_per_million": 1.5 }
        }))
        .unwrap();
        let cmd = CreateModelCommand::try_from(req).unwrap();
        assert_eq!(cmd.context_window, 0);
        assert!(cmd.plan_ids.is_empty());
    }

    #[test]
    fn user_list_query_defaults_and_trims_search() {
        let query = UserListQuery {
            search: Some("  ".into()),
            ..UserListQuery::default()
        };
        assert_eq!(query.page_request(), PageRequest::default());
        assert_eq!(query.search(), None);

        let query = UserListQuery {
            page: Some(3),
            per_page: Some(5),
            search: Some(" ann ".into()),
        };
        assert_eq!(query.page_request(), PageRequest::new(3, 5));
        assert_eq!(query.search(), Some("ann"));
    }

    #[test]
    fn create_user_defaults_to_member_role() {
        let req: CreateUserRequest =
            serde_json::from_str(r#"{"email":"new@example.com"}"#).unwrap();
        assert_eq!(CreateUserCommand::from(req).role, UserRole::User);
    }
}
