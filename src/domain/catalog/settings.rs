//! Runtime-editable settings.
//!
//! Admins store plain key/value pairs; [`RuntimeSettings`] is the typed view
//! the chat pipeline reads. Unknown keys are stored but ignored.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::billing::BillingMode;
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{Timestamp, ValidationError};

pub const DAILY_MESSAGE_LIMIT: &str = "daily_message_limit";
pub const MAX_MESSAGE_LENGTH: &str = "max_message_length";
pub const HISTORY_LIMIT: &str = "history_limit";
pub const SYSTEM_PROMPT: &str = "system_prompt";
pub const DEFAULT_PROVIDER: &str = "default_provider";
pub const BILLING_MODE: &str = "billing_mode";
pub const CREDITS_PER_MESSAGE: &str = "credits_per_message";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub updated_at: Timestamp,
}

impl Setting {
    /// Validated setting; known keys must carry a value of the right shape.
    pub fn new(key: &str, value: &str) -> Result<Self, ValidationError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ValidationError::empty_field("key"));
        }
        let well_formed = key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if key.len() > 100 || !well_formed {
            return Err(ValidationError::invalid_format(
                "key",
                "use lowercase letters, digits and '_'",
            ));
        }
        let value = value.trim();
        validate_value(key, value)?;
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Timestamp::now(),
        })
    }
}

fn validate_value(key: &str, value: &str) -> Result<(), ValidationError> {
    match key {
        DAILY_MESSAGE_LIMIT | CREDITS_PER_MESSAGE => {
            value.parse::<u32>().map_err(|_| {
                ValidationError::invalid_format(key, "expected a non-negative integer")
            })?;
        }
        MAX_MESSAGE_LENGTH | HISTORY_LIMIT => match value.parse::<u32>() {
            Ok(n) if n > 0 => {}
            _ => return Err(ValidationError::invalid_format(key, "expected a positive integer")),
        },
        DEFAULT_PROVIDER => {
            value.parse::<ProviderKind>()?;
        }
        BILLING_MODE => {
            value.parse::<BillingMode>()?;
        }
        _ => {}
    }
    Ok(())
}

/// Typed settings consulted on every chat request.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    pub daily_message_limit: u32,
    pub max_message_length: usize,
    pub history_limit: u32,
    pub system_prompt: Option<String>,
    pub default_provider: ProviderKind,
    pub billing_mode: BillingMode,
    pub credits_per_message: u32,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            daily_message_limit: 50,
            max_message_length: 10_000,
            history_limit: 20,
            system_prompt: None,
            default_provider: ProviderKind::Google,
            billing_mode: BillingMode::Disabled,
            credits_per_message: 1,
        }
    }
}

impl RuntimeSettings {
    /// Overlays stored settings onto these defaults.
    ///
    /// A stored value that fails to parse is skipped with a warning.
    pub fn overlay(mut self, settings: &[Setting]) -> Self {
        for setting in settings {
            if let Err(e) = self.apply(&setting.key, &setting.value) {
                warn!(key = %setting.key, error = %e, "ignoring invalid stored setting");
            }
        }
        self
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ValidationError> {
        validate_value(key, value)?;
        let as_u32 = || {
            value
                .parse::<u32>()
                .map_err(|_| ValidationError::invalid_format(key, "not a number"))
        };
        match key {
            DAILY_MESSAGE_LIMIT => self.daily_message_limit = as_u32()?,
            MAX_MESSAGE_LENGTH => self.max_message_length = as_u32()? as usize,
            HISTORY_LIMIT => self.history_limit = as_u32()?,
            CREDITS_PER_MESSAGE => self.credits_per_message = as_u32()?,
            SYSTEM_PROMPT => {
                self.system_prompt = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            DEFAULT_PROVIDER => self.default_provider = value.parse()?,
            BILLING_MODE => self.billing_mode = value.parse()?,
            _ => {}
        }
        Ok(())
    }
}
