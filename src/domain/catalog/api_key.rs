use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{ApiKeyId, Timestamp, ValidationError};

/// A provider credential managed from the admin console.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub provider: ProviderKind,
    pub name: String,
    pub secret: Secret<String>,
    pub is_active: bool,
    pub usage_count: u64,
    /// `None` means no cap.
    pub usage_limit: Option<u64>,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ApiKey {
    pub fn new(
        provider: ProviderKind,
        name: &str,
        secret: &str,
        usage_limit: Option<u64>,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        let secret = secret.trim();
        if secret.is_empty() {
            return Err(ValidationError::empty_field("secret"));
        }
        Ok(Self {
            id: ApiKeyId::new(),
            provider,
            name: name.to_string(),
            secret: Secret::new(secret.to_string()),
            is_active: true,
            usage_count: 0,
            usage_limit,
            last_used_at: None,
            created_at: Timestamp::now(),
        })
    }

    pub fn has_capacity(&self) -> bool {
        self.usage_limit.map_or(true, |limit| self.usage_count < limit)
    }

    pub fn is_usable(&self) -> bool {
        self.is_active && self.has_capacity()
    }

    /// Applies an admin edit. Blank names and secrets are rejected.
    pub fn apply(&mut self, update: ApiKeyUpdate) -> Result<(), ValidationError> {
        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::empty_field("name"));
            }
            self.name = name.to_string();
        }
        if let Some(secret) = update.secret {
            let secret = secret.trim();
            if secret.is_empty() {
                return Err(ValidationError::empty_field("secret"));
            }
            self.secret = Secret::new(secret.to_string());
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(usage_limit) = update.usage_limit {
            self.usage_limit = usage_limit;
        }
        Ok(())
    }

    pub fn masked(&self) -> String {
        mask_secret(self.secret.expose_secret())
    }

    /// Listing view with the secret masked.
    pub fn summary(&self) -> ApiKeySummary {
        ApiKeySummary {
            id: self.id,
            provider: self.provider,
            name: self.name.clone(),
            masked_secret: self.masked(),
            is_active: self.is_active,
            usage_count: self.usage_count,
            usage_limit: self.usage_limit,
            last_used_at: self.last_used_at,
            created_at: self.created_at,
        }
    }
}

/// Partial edit of an API key; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyUpdate {
    pub name: Option<String>,
    pub secret: Option<String>,
    pub is_active: Option<bool>,
    pub usage_limit: Option<Option<u64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiKeySummary {
    pub id: ApiKeyId,
    pub provider: ProviderKind,
    pub name: String,
    pub masked_secret: String,
    pub is_active: bool,
    pub usage_count: u64,
    pub usage_limit: Option<u64>,
    pub last_used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Picks the key to spend next: usable, least used first.
pub fn select_key<'a>(keys: &'a [ApiKey], provider: ProviderKind) -> Option<&'a ApiKey> {
    keys.iter()
        .filter(|k| k.provider == provider && k.is_usable())
        .min_by_key(|k| (k.usage_count, k.created_at))
}

/// First four and last four characters; short secrets are fully hidden.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(provider: ProviderKind, usage: u64, limit: Option<u64>) -> ApiKey {
        let mut k = ApiKey::new(provider, "primary", "sk-test-0123456789", limit).unwrap();
        k.usage_count = usage;
        k
    }

    #[test]
    fn masks_long_secrets() {
        assert_eq!(mask_secret("sk-or-v1-abcdef123456"), "sk-o...3456");
    }

    #[test]
    fn short_secrets_fully_hidden() {
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("abcdefgh"), "********");
    }

    #[test]
    fn new_key_requires_name_and_secret() {
        assert!(ApiKey::new(ProviderKind::Google, " ", "secret", None).is_err());
        assert!(ApiKey::new(ProviderKind::Google, "main", "", None).is_err());
    }

    #[test]
    fn capacity_respects_limit() {
        assert!(key(ProviderKind::Google, 9, Some(10)).has_capacity());
        assert!(!key(ProviderKind::Google, 10, Some(10)).has_capacity());
        assert!(key(ProviderKind::Google, 1_000_000, None).has_capacity());
    }

    #[test]
    fn select_prefers_least_used_usable_key() {
        let mut inactive = key(ProviderKind::Google, 0, None);
        inactive.is_active = false;
        let exhausted = key(ProviderKind::Google, 5, Some(5));
        let busy = key(ProviderKind::Google, 40, None);
        let quiet = key(ProviderKind::Google, 3, Some(100));
        let other_provider = key(ProviderKind::OpenRouter, 0, None);

        let keys = vec![inactive, exhausted, busy, quiet.clone(), other_provider];
        let chosen = select_key(&keys, ProviderKind::Google).unwrap();
        assert_eq!(chosen.id, quiet.id);
    }

    #[test]
    fn select_returns_none_without_usable_keys() {
        let keys = vec![key(ProviderKind::OpenRouter, 1, Some(1))];
        assert!(select_key(&keys, ProviderKind::OpenRouter).is_none());
        assert!(select_key(&keys, ProviderKind::Google).is_none());
    }

    #[test]
    fn summary_never_contains_secret() {
        let k = key(ProviderKind::Google, 0, None);
        let json = serde_json::to_string(&k.summary()).unwrap();
        assert!(!json.contains("sk-test-0123456789"));
        assert!(json.contains("sk-t...6789"));
    }
}
