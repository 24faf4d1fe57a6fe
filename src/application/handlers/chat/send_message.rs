//! SendMessage command handler.
//!
//! Runs one user message through the chat pipeline: validation, quota and
//! credit checks, provider dispatch and the usage bookkeeping that follows a
//! completed exchange.
//!
//! The quota slot and the message's credits are taken atomically before the
//! provider is called and given back if the exchange fails, so concurrent
//! sends cannot overrun the daily limit or spend credits they do not have.

use std::sync::Arc;

use chrono::NaiveDate;
use secrecy::Secret;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::{Entitlements, SettingsLoader};
use crate::config::AiConfig;
use crate::domain::billing::BillingMode;
use crate::domain::catalog::{select_key, ModelPricing, RuntimeSettings};
use crate::domain::chat::{
    estimate_tokens, validate_content, ChatMessage, Conversation, ProviderKind,
};
use crate::domain::foundation::{
    ApiKeyId, AuthenticatedUser, ConversationId, DomainError, Timestamp, UserId, ValidationError,
};
use crate::domain::usage::{DailyQuota, UsageDelta};
use crate::ports::{
    AIError, AIProvider, ApiKeyRepository, BillingRepository, CompletionRequest,
    CompletionResponse, ConversationRepository, Message, ModelRegistry, ProviderRegistry,
    TokenUsage, UsageRepository,
};

/// Command to send a message, optionally into an existing conversation.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub user: AuthenticatedUser,
    pub conversation_id: Option<ConversationId>,
    pub content: String,
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
}

/// Errors that can occur when sending a message.
#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message exceeds {max} characters (got {actual})")]
    MessageTooLong { max: usize, actual: usize },

    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Model {model} is not available for {provider}")]
    ModelNotAvailable { provider: ProviderKind, model: String },

    #[error("Model {0} requires a subscription plan")]
    ModelRequiresPlan(String),

    #[error("Daily message limit reached ({used}/{limit})")]
    DailyLimitReached { used: u32, limit: u32 },

    #[error("Insufficient credits: {balance} available, {required} required")]
    InsufficientCredits { balance: i64, required: u32 },

    #[error("Provider {0} is not configured")]
    ProviderNotConfigured(ProviderKind),

    #[error("Provider rate limited, retry after {retry_after_secs}s")]
    ProviderRateLimited { retry_after_secs: u32 },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl SendMessageError {
    pub fn code(&self) -> &'static str {
        match self {
            SendMessageError::EmptyMessage => "EMPTY_MESSAGE",
            SendMessageError::MessageTooLong { .. } => "MESSAGE_TOO_LONG",
            SendMessageError::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            SendMessageError::ModelNotAvailable { .. } => "MODEL_NOT_AVAILABLE",
            SendMessageError::ModelRequiresPlan(_) => "MODEL_REQUIRES_PLAN",
            SendMessageError::DailyLimitReached { .. } => "DAILY_LIMIT_REACHED",
            SendMessageError::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            SendMessageError::ProviderNotConfigured(_) => "PROVIDER_NOT_CONFIGURED",
            SendMessageError::ProviderRateLimited { .. } => "PROVIDER_RATE_LIMITED",
            SendMessageError::Provider(_) => "PROVIDER_ERROR",
            SendMessageError::Domain(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ValidationError> for SendMessageError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { .. } => SendMessageError::EmptyMessage,
            ValidationError::TooLong { max, actual, .. } => {
                SendMessageError::MessageTooLong { max, actual }
            }
            other => SendMessageError::Domain(other.into()),
        }
    }
}

impl From<AIError> for SendMessageError {
    fn from(err: AIError) -> Self {
        match err {
            AIError::RateLimited { retry_after_secs } => {
                SendMessageError::ProviderRateLimited { retry_after_secs }
            }
            AIError::NotConfigured(kind) => SendMessageError::ProviderNotConfigured(kind),
            other => SendMessageError::Provider(other.to_string()),
        }
    }
}

/// Result of a completed exchange.
#[derive(Debug, Clone)]
pub struct SendMessageResult {
    pub conversation: Conversation,
    /// True when this message opened the conversation.
    pub created: bool,
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub usage: TokenUsage,
    /// Quota after this message was counted.
    pub quota: DailyQuota,
}

/// Ports shared by the chat handlers.
#[derive(Clone)]
pub struct ChatPorts {
    pub conversations: Arc<dyn ConversationRepository>,
    pub usage: Arc<dyn UsageRepository>,
    pub models: Arc<dyn ModelRegistry>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub billing: Arc<dyn BillingRepository>,
    pub providers: ProviderRegistry,
    pub settings: SettingsLoader,
    pub ai: Arc<AiConfig>,
}

/// Where one message goes and the credential it uses.
struct Route {
    provider: ProviderKind,
    model: String,
    pricing: ModelPricing,
    secret: Secret<String>,
    adapter: Arc<dyn AIProvider>,
}

/// Quota slot and credits taken for one in-flight message.
struct Hold {
    /// Messages counted today, this one included.
    used: u32,
    credits: i64,
}

/// What the provider call produced, with the records written on the way.
struct Exchange {
    conversation: Conversation,
    created: bool,
    user_message: ChatMessage,
    response: CompletionResponse,
}

/// Handler for SendMessage commands.
pub struct SendMessageHandler {
    ports: ChatPorts,
}

impl SendMessageHandler {
    pub fn new(ports: ChatPorts) -> Self {
        Self { ports }
    }

    pub async fn handle(
        &self,
        cmd: SendMessageCommand,
    ) -> Result<SendMessageResult, SendMessageError> {
        let settings = self.ports.settings.load().await?;
        let user = &cmd.user;
        let now = Timestamp::now();
        let day = now.date();

        // 1. Validate content
        let content = validate_content(&cmd.content, settings.max_message_length)?;

        // 2. Resolve conversation and route
        let existing = match cmd.conversation_id {
            Some(id) => Some(
                self.ports
                    .conversations
                    .find_for_user(&id, &user.id)
                    .await?
                    .ok_or(SendMessageError::ConversationNotFound)?,
            ),
            None => None,
        };
        let provider = cmd
            .provider
            .or(existing.as_ref().map(|c| c.provider))
            .unwrap_or(settings.default_provider);
        let model = match cmd.model.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => model.to_string(),
            None => match &existing {
                Some(conv) if conv.provider == provider => conv.model.clone(),
                _ => self.ports.ai.default_model(provider).to_string(),
            },
        };

        // 3. Resolve model against the registry and plan gating
        let entitlements = Entitlements::load(self.ports.billing.as_ref(), &user.id, now).await?;
        let pricing = self.resolve_pricing(provider, &model, &entitlements).await?;

        // 4. Daily quota
        let today = self.ports.usage.get_for_day(&user.id, day).await?;
        let quota = DailyQuota::new(today.message_count, entitlements.daily_limit(&settings));
        if let Some(limit) = quota.limit.filter(|_| quota.is_exhausted()) {
            return Err(SendMessageError::DailyLimitReached {
                used: quota.used,
                limit,
            });
        }

        // 5. Credits
        if settings.billing_mode == BillingMode::Credits {
            let credits = self.ports.billing.credits(&user.id).await?;
            if !credits.can_afford(settings.credits_per_message) {
                return Err(SendMessageError::InsufficientCredits {
                    balance: credits.balance,
                    required: settings.credits_per_message,
                });
            }
        }

        // 6. API key and adapter
        let (key_id, secret) = self.resolve_key(provider).await?;
        let route = Route {
            provider,
            model,
            pricing,
            secret,
            adapter: self.ports.providers.get(provider)?,
        };

        // 7. Take the quota slot and credits; steps 4 and 5 only read
        let hold = self.hold(&user.id, day, quota.limit, &settings).await?;

        // 8-10. Conversation, user message, dispatch
        let exchange = match self.converse(user, existing, &content, &route, &settings, now).await {
            Ok(exchange) => exchange,
            Err(e) => {
                self.release(&user.id, day, &hold).await;
                return Err(e);
            }
        };
        let Exchange {
            mut conversation,
            created,
            user_message,
            response,
        } = exchange;
        let usage = response.usage;

        // 11. Assistant message
        let assistant_message = ChatMessage::assistant(
            conversation.id,
            response.content,
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.cost_usd,
        );
        self.ports
            .conversations
            .append_message(&assistant_message)
            .await?;

        // 12. Bookkeeping
        self.ports.conversations.touch(&conversation.id, now).await?;
        conversation.updated_at = now;
        if let Some(key_id) = key_id {
            self.ports.api_keys.record_use(&key_id, now).await?;
        }
        self.ports
            .usage
            .record(
                &user.id,
                day,
                UsageDelta::tokens(usage.prompt_tokens, usage.completion_tokens, usage.cost_usd),
            )
            .await?;

        info!(
            user_id = %user.id,
            conversation_id = %conversation.id,
            provider = %route.provider,
            model = %route.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            cost_usd = usage.cost_usd,
            "message exchanged"
        );

        // 13. Respond
        Ok(SendMessageResult {
            conversation,
            created,
            user_message,
            assistant_message,
            usage,
            quota: DailyQuota::new(hold.used, quota.limit),
        })
    }

    async fn hold(
        &self,
        user_id: &UserId,
        day: NaiveDate,
        limit: Option<u32>,
        settings: &RuntimeSettings,
    ) -> Result<Hold, SendMessageError> {
        let Some(used) = self.ports.usage.reserve_message(user_id, day, limit).await? else {
            let limit = limit.unwrap_or_default();
            return Err(SendMessageError::DailyLimitReached { used: limit, limit });
        };
        let mut hold = Hold { used, credits: 0 };

        if settings.billing_mode == BillingMode::Credits {
            let required = settings.credits_per_message;
            if !self.ports.billing.try_debit(user_id, i64::from(required)).await? {
                self.release(user_id, day, &hold).await;
                let balance = self.ports.billing.credits(user_id).await?.balance;
                return Err(SendMessageError::InsufficientCredits { balance, required });
            }
            hold.credits = i64::from(required);
        }
        Ok(hold)
    }

    /// Gives back what `hold` took. The caller is already failing, so errors
    /// here are only logged.
    async fn release(&self, user_id: &UserId, day: NaiveDate, hold: &Hold) {
        if let Err(e) = self.ports.usage.release_message(user_id, day).await {
            warn!(user_id = %user_id, error = %e, "failed to release quota slot");
        }
        if hold.credits > 0 {
            if let Err(e) = self.ports.billing.adjust_credits(user_id, hold.credits, false).await {
                warn!(
                    user_id = %user_id,
                    credits = hold.credits,
                    error = %e,
                    "failed to refund credits"
                );
            }
        }
    }

    async fn converse(
        &self,
        user: &AuthenticatedUser,
        existing: Option<Conversation>,
        content: &str,
        route: &Route,
        settings: &RuntimeSettings,
        now: Timestamp,
    ) -> Result<Exchange, SendMessageError> {
        // 8. Conversation
        let (conversation, created) = match existing {
            Some(mut conv) => {
                if conv.provider != route.provider || conv.model != route.model {
                    conv.provider = route.provider;
                    conv.model = route.model.clone();
                    conv.updated_at = now;
                    self.ports.conversations.update(&conv).await?;
                }
                (conv, false)
            }
            None => {
                let conv =
                    Conversation::start(user.id, content, route.provider, route.model.clone());
                self.ports.conversations.create(&conv).await?;
                (conv, true)
            }
        };

        // 9. User message
        let user_message = ChatMessage::user(conversation.id, content, estimate_tokens(content));
        self.ports.conversations.append_message(&user_message).await?;

        // 10. History and dispatch
        let request = self.build_request(&conversation, settings, route).await?;
        let response = match route.adapter.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    user_id = %user.id,
                    conversation_id = %conversation.id,
                    provider = %route.provider,
                    model = %route.model,
                    error = %e,
                    "provider call failed"
                );
                return Err(e.into());
            }
        };

        Ok(Exchange {
            conversation,
            created,
            user_message,
            response,
        })
    }

    /// Registry pricing for the pair. Providers with no registered models
    /// accept any model at the configured default pricing.
    async fn resolve_pricing(
        &self,
        provider: ProviderKind,
        model: &str,
        entitlements: &Entitlements,
    ) -> Result<ModelPricing, SendMessageError> {
        let not_available = || SendMessageError::ModelNotAvailable {
            provider,
            model: model.to_string(),
        };

        match self.ports.models.find_by_name(provider, model).await? {
            Some(registered) if !registered.is_active => Err(not_available()),
            Some(registered) if !registered.is_available_to(entitlements.plan_id()) => {
                Err(SendMessageError::ModelRequiresPlan(registered.display_name))
            }
            Some(registered) => Ok(registered.pricing),
            None if self.ports.models.has_models_for(provider).await? => Err(not_available()),
            None => {
                debug!(provider = %provider, model, "unregistered model, using default pricing");
                Ok(self.ports.ai.default_pricing())
            }
        }
    }

    /// Least-used stored key with capacity, else the configured key.
    async fn resolve_key(
        &self,
        provider: ProviderKind,
    ) -> Result<(Option<ApiKeyId>, Secret<String>), SendMessageError> {
        let keys = self.ports.api_keys.list(Some(provider)).await?;
        if let Some(key) = select_key(&keys, provider) {
            return Ok((Some(key.id), key.secret.clone()));
        }
        self.ports
            .ai
            .api_key(provider)
            .map(|secret| (None, secret))
            .ok_or(SendMessageError::ProviderNotConfigured(provider))
    }

    async fn build_request(
        &self,
        conversation: &Conversation,
        settings: &RuntimeSettings,
        route: &Route,
    ) -> Result<CompletionRequest, SendMessageError> {
        let history = self
            .ports
            .conversations
            .recent_messages(&conversation.id, settings.history_limit)
            .await?;

        let mut request =
            CompletionRequest::new(route.model.as_str(), route.secret.clone(), route.pricing)
                .with_messages(history.into_iter().map(|m| Message::new(m.role, m.content)))
                .with_max_tokens(self.ports.ai.max_tokens)
                .with_temperature(self.ports.ai.temperature);
        if let Some(prompt) = &settings.system_prompt {
            request = request.with_system_prompt(prompt.as_str());
        }
        Ok(request)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::memory::{
        InMemoryApiKeyRepository, InMemoryBillingRepository, InMemoryConversationRepository,
        InMemoryModelRegistry, InMemorySettingRepository, InMemoryUsageRepository,
    };
    use crate::domain::foundation::{UserId, UserRole};

    /// In-memory ports plus handles to the concrete stores.
    pub struct ChatFixture {
        pub conversations: InMemoryConversationRepository,
        pub usage: InMemoryUsageRepository,
        pub models: InMemoryModelRegistry,
        pub api_keys: InMemoryApiKeyRepository,
        pub billing: InMemoryBillingRepository,
        pub settings: InMemorySettingRepository,
        pub google: MockAIProvider,
        pub openrouter: MockAIProvider,
        pub ai: AiConfig,
    }

    impl ChatFixture {
        pub fn new() -> Self {
            Self {
                conversations: InMemoryConversationRepository::new(),
                usage: InMemoryUsageRepository::new(),
                models: InMemoryModelRegistry::new(),
                api_keys: InMemoryApiKeyRepository::new(),
                billing: InMemoryBillingRepository::new(),
                settings: InMemorySettingRepository::new(),
                google: MockAIProvider::new(ProviderKind::Google),
                openrouter: MockAIProvider::new(ProviderKind::OpenRouter),
                ai: AiConfig {
                    google_api_key: Some(Secret::new("config-google-key".to_string())),
                    ..AiConfig::default()
                },
            }
        }

        pub fn ports(&self) -> ChatPorts {
            ChatPorts {
                conversations: Arc::new(self.conversations.clone()),
                usage: Arc::new(self.usage.clone()),
                models: Arc::new(self.models.clone()),
                api_keys: Arc::new(self.api_keys.clone()),
                billing: Arc::new(self.billing.clone()),
                providers: ProviderRegistry::new()
                    .with(Arc::new(self.google.clone()))
                    .with(Arc::new(self.openrouter.clone())),
                settings: SettingsLoader::with_defaults(
                    Arc::new(self.settings.clone()),
                    RuntimeSettings::default(),
                ),
                ai: Arc::new(self.ai.clone()),
            }
        }
    }

    pub fn member() -> AuthenticatedUser {
        AuthenticatedUser::new(UserId::new(), "member@example.com", None, UserRole::User)
    }
}
