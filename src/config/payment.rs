//! Payment configuration

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe webhooks)
///
/// Checkout sessions are created elsewhere; this service only consumes the
/// resulting webhook events, so the signing secret is all it needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<Secret<String>>,
}

impl PaymentConfig {
    /// Webhook secret when configured and non-blank.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.stripe_webhook_secret
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .filter(|s| !s.is_empty())
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.webhook_secret() {
            Some(secret) if !secret.starts_with("whsec_") => {
                Err(ValidationError::InvalidStripeWebhookSecret)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhooks_optional() {
        let config = PaymentConfig::default();
        assert!(config.webhook_secret().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_webhook_secret_prefix_checked() {
        let config = PaymentConfig {
            stripe_webhook_secret: Some(Secret::new("secret".to_string())),
        };
        assert!(config.validate().is_err());

        let config = PaymentConfig {
            stripe_webhook_secret: Some(Secret::new("whsec_abc".to_string())),
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.webhook_secret(), Some("whsec_abc"));
    }
}
