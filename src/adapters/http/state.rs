//! Shared application state for the HTTP layer.
//!
//! Holds the ports; handlers are built per request from it.

use std::sync::Arc;

use crate::application::handlers::admin::{
    AnalyticsHandler, ApiKeyAdminHandler, CreditAdjustmentHandler, ModelAdminHandler,
    PlanAdminHandler, SettingsAdminHandler, UserAdminHandler,
};
use crate::application::handlers::billing::{BillingQueryHandler, ProcessWebhookHandler};
use crate::application::handlers::chat::{
    ChatPorts, DeleteConversationHandler, GetAccountHandler, GetConversationHandler,
    ListConversationsHandler, ListModelsHandler, RenameConversationHandler, SendMessageHandler,
};
use crate::application::SettingsLoader;
use crate::config::{AiConfig, LimitsConfig};
use crate::domain::billing::StripeWebhookVerifier;
use crate::ports::{
    AnalyticsReader, ApiKeyRepository, BillingRepository, ConversationRepository, ModelRegistry,
    ProviderRegistry, RateLimiter, SessionValidator, SettingRepository, UsageRepository,
    UserRepository,
};

use super::middleware::AuthState;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub usage: Arc<dyn UsageRepository>,
    pub models: Arc<dyn ModelRegistry>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub settings: Arc<dyn SettingRepository>,
    pub billing: Arc<dyn BillingRepository>,
    pub analytics: Arc<dyn AnalyticsReader>,
    pub providers: ProviderRegistry,
    pub session_validator: Arc<dyn SessionValidator>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub ai: Arc<AiConfig>,
    pub limits: LimitsConfig,
    /// Stripe signing secret; webhooks are refused without it.
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            validator: self.session_validator.clone(),
            users: self.users.clone(),
        }
    }

    pub fn settings_loader(&self) -> SettingsLoader {
        SettingsLoader::new(self.settings.clone(), &self.limits)
    }

    pub fn chat_ports(&self) -> ChatPorts {
        ChatPorts {
            conversations: self.conversations.clone(),
            usage: self.usage.clone(),
            models: self.models.clone(),
            api_keys: self.api_keys.clone(),
            billing: self.billing.clone(),
            providers: self.providers.clone(),
            settings: self.settings_loader(),
            ai: self.ai.clone(),
        }
    }

    // ── chat ────────────────────────────────────────────────────────────────

    pub fn send_message_handler(&self) -> SendMessageHandler {
        SendMessageHandler::new(self.chat_ports())
    }

    pub fn list_conversations_handler(&self) -> ListConversationsHandler {
        ListConversationsHandler::new(self.conversations.clone())
    }

    pub fn get_conversation_handler(&self) -> GetConversationHandler {
        GetConversationHandler::new(self.conversations.clone())
    }

    pub fn rename_conversation_handler(&self) -> RenameConversationHandler {
        RenameConversationHandler::new(self.conversations.clone())
    }

    pub fn delete_conversation_handler(&self) -> DeleteConversationHandler {
        DeleteConversationHandler::new(self.conversations.clone())
    }

    pub fn list_models_handler(&self) -> ListModelsHandler {
        ListModelsHandler::new(
            self.models.clone(),
            self.api_keys.clone(),
            self.billing.clone(),
            self.settings_loader(),
            self.ai.clone(),
        )
    }

    pub fn account_handler(&self) -> GetAccountHandler {
        GetAccountHandler::new(
            self.users.clone(),
            self.usage.clone(),
            self.billing.clone(),
            self.settings_loader(),
        )
    }

    // ── billing ─────────────────────────────────────────────────────────────

    pub fn billing_queries(&self) -> BillingQueryHandler {
        BillingQueryHandler::new(self.billing.clone(), self.settings_loader())
    }

    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(
            self.webhook_secret.as_deref().map(StripeWebhookVerifier::new),
            self.users.clone(),
            self.billing.clone(),
        )
    }

    // ── admin ───────────────────────────────────────────────────────────────

    pub fn user_admin(&self) -> UserAdminHandler {
        UserAdminHandler::new(self.users.clone(), self.usage.clone(), self.billing.clone())
    }

    pub fn api_key_admin(&self) -> ApiKeyAdminHandler {
        ApiKeyAdminHandler::new(self.api_keys.clone())
    }

    pub fn settings_admin(&self) -> SettingsAdminHandler {
        SettingsAdminHandler::new(self.settings.clone())
    }

    pub fn plan_admin(&self) -> PlanAdminHandler {
        PlanAdminHandler::new(self.billing.clone())
    }

    pub fn model_admin(&self) -> ModelAdminHandler {
        ModelAdminHandler::new(self.models.clone(), self.billing.clone())
    }

    pub fn credit_admin(&self) -> CreditAdjustmentHandler {
        CreditAdjustmentHandler::new(self.users.clone(), self.billing.clone())
    }

    pub fn analytics(&self) -> AnalyticsHandler {
        AnalyticsHandler::new(self.analytics.clone())
    }
}
