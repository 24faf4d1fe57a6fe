//! AI provider configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::chat::ProviderKind;
use crate::domain::catalog::ModelPricing;

/// AI provider configuration
///
/// Provider keys here are fallbacks; keys managed through the admin API
/// take precedence at request time.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Google AI Studio API key
    pub google_api_key: Option<Secret<String>>,

    /// OpenRouter API key
    pub openrouter_api_key: Option<Secret<String>>,

    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,

    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,

    #[serde(default = "default_google_model")]
    pub google_default_model: String,

    #[serde(default = "default_openrouter_model")]
    pub openrouter_default_model: String,

    /// Sent to OpenRouter as `HTTP-Referer`
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// Sent to OpenRouter as `X-Title`
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Upper bound on completion length
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on transient failure
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Pricing used when a model is missing from the registry (USD per million tokens)
    #[serde(default = "default_input_price")]
    pub default_input_price_per_million: f64,

    #[serde(default = "default_output_price")]
    pub default_output_price_per_million: f64,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fallback key for a provider, ignoring blank values.
    pub fn api_key(&self, provider: ProviderKind) -> Option<Secret<String>> {
        let key = match provider {
            ProviderKind::Google => self.google_api_key.as_ref(),
            ProviderKind::OpenRouter => self.openrouter_api_key.as_ref(),
        };
        key.filter(|k| !k.expose_secret().trim().is_empty()).cloned()
    }

    pub fn default_model(&self, provider: ProviderKind) -> &str {
        match provider {
            ProviderKind::Google => &self.google_default_model,
            ProviderKind::OpenRouter => &self.openrouter_default_model,
        }
    }

    pub fn default_pricing(&self) -> ModelPricing {
        ModelPricing {
            input_per_million: self.default_input_price_per_million,
            output_per_million: self.default_output_price_per_million,
        }
    }

    /// Validate AI configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, url) in [
            ("google", &self.google_base_url),
            ("openrouter", &self.openrouter_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidBaseUrl(name));
            }
        }
        if self.default_input_price_per_million < 0.0
            || self.default_output_price_per_million < 0.0
        {
            return Err(ValidationError::NegativePricing);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            openrouter_api_key: None,
            google_base_url: default_google_base_url(),
            openrouter_base_url: default_openrouter_base_url(),
            google_default_model: default_google_model(),
            openrouter_default_model: default_openrouter_model(),
            app_url: default_app_url(),
            app_name: default_app_name(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            default_input_price_per_million: default_input_price(),
            default_output_price_per_million: default_output_price(),
        }
    }
}

fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_google_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_openrouter_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_app_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_app_name() -> String {
    "Chat Portal".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_input_price() -> f64 {
    0.5
}

fn default_output_price() -> f64 {
    1.5
}
