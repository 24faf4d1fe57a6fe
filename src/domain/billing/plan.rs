use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PlanId, Timestamp, ValidationError};

/// How users are charged for chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingMode {
    /// Everyone chats under the global daily limit.
    #[default]
    Disabled,
    /// Plans raise (or remove) the daily limit and unlock gated models.
    Subscription,
    /// Each message debits the user's prepaid balance.
    Credits,
}

impl BillingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingMode::Disabled => "disabled",
            BillingMode::Subscription => "subscription",
            BillingMode::Credits => "credits",
        }
    }
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(BillingMode::Disabled),
            "subscription" => Ok(BillingMode::Subscription),
            "credits" => Ok(BillingMode::Credits),
            _ => Err(ValidationError::invalid_format(
                "billing_mode",
                "expected disabled, subscription or credits",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }

    /// Length of one billing period.
    ///
    /// Months are approximated as 30 days.
    pub fn period_days(&self) -> i64 {
        match self {
            BillingInterval::Monthly => 30,
            BillingInterval::Yearly => 365,
        }
    }

    pub fn period_end(&self, start: Timestamp) -> Timestamp {
        start.plus_days(self.period_days())
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingInterval::Monthly),
            "yearly" => Ok(BillingInterval::Yearly),
            _ => Err(ValidationError::invalid_format(
                "billing_interval",
                "expected monthly or yearly",
            )),
        }
    }
}

/// A purchasable plan.
///
/// `daily_message_limit: None` means unlimited messages while subscribed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub interval: BillingInterval,
    pub daily_message_limit: Option<u32>,
    /// Credits granted each paid period
    pub monthly_credits: i64,
    pub stripe_price_id: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Fields an admin supplies when creating or replacing a plan.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanDraft {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub interval: BillingInterval,
    pub daily_message_limit: Option<u32>,
    #[serde(default)]
    pub monthly_credits: i64,
    pub stripe_price_id: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_true() -> bool {
    true
}

impl PlanDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if self.price_cents < 0 {
            return Err(ValidationError::out_of_range("price_cents", 0, i64::MAX, self.price_cents));
        }
        if self.monthly_credits < 0 {
            return Err(ValidationError::out_of_range(
                "monthly_credits",
                0,
                i64::MAX,
                self.monthly_credits,
            ));
        }
        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format("currency", "expected an ISO 4217 code"));
        }
        Ok(())
    }
}

impl SubscriptionPlan {
    pub fn create(draft: PlanDraft) -> Result<Self, ValidationError> {
        let mut plan = Self {
            id: PlanId::new(),
            name: String::new(),
            description: None,
            price_cents: 0,
            currency: String::new(),
            interval: draft.interval,
            daily_message_limit: None,
            monthly_credits: 0,
            stripe_price_id: None,
            is_active: true,
            created_at: Timestamp::now(),
        };
        plan.replace(draft)?;
        Ok(plan)
    }

    /// Overwrites the editable fields, keeping id and creation time.
    pub fn replace(&mut self, draft: PlanDraft) -> Result<(), ValidationError> {
        draft.validate()?;
        self.name = draft.name.trim().to_string();
        self.description = draft.description.filter(|d| !d.trim().is_empty());
        self.price_cents = draft.price_cents;
        self.currency = draft.currency.trim().to_lowercase();
        self.interval = draft.interval;
        self.daily_message_limit = draft.daily_message_limit;
        self.monthly_credits = draft.monthly_credits;
        self.stripe_price_id = draft.stripe_price_id.filter(|p| !p.trim().is_empty());
        self.is_active = draft.is_active;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> PlanDraft {
        PlanDraft {
            name: "Pro".to_string(),
            description: Some("More messages".to_string()),
            price_cents: 999,
            currency: "USD".to_string(),
            interval: BillingInterval::Monthly,
            daily_message_limit: Some(500),
            monthly_credits: 1000,
            stripe_price_id: Some("price_123".to_string()),
            is_active: true,
        }
    }

    #[test]
    fn create_normalizes_fields() {
        let plan = SubscriptionPlan::create(draft()).unwrap();
        assert_eq!(plan.currency, "usd");
        assert_eq!(plan.daily_message_limit, Some(500));
        assert!(plan.is_active);
    }

    #[test]
    fn draft_validation() {
        assert!(PlanDraft { name: " ".into(), ..draft() }.validate().is_err());
        assert!(PlanDraft { price_cents: -1, ..draft() }.validate().is_err());
        assert!(PlanDraft { monthly_credits: -5, ..draft() }.validate().is_err());
        assert!(PlanDraft { currency: "dollars".into(), ..draft() }.validate().is_err());
    }

    #[test]
    fn replace_keeps_identity() {
        let mut plan = SubscriptionPlan::create(draft()).unwrap();
        let id = plan.id;
        plan.replace(PlanDraft {
            name: "Pro Plus".into(),
            daily_message_limit: None,
            ..draft()
        })
        .unwrap();
        assert_eq!(plan.id, id);
        assert_eq!(plan.name, "Pro Plus");
        assert_eq!(plan.daily_message_limit, None);
    }

    #[test]
    fn period_lengths() {
        let start = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        assert_eq!(
            BillingInterval::Monthly.period_end(start).duration_since(&start),
            chrono::Duration::days(30)
        );
        assert_eq!(BillingInterval::Yearly.period_days(), 365);
    }

    #[test]
    fn billing_mode_parses() {
        assert_eq!("credits".parse::<BillingMode>().unwrap(), BillingMode::Credits);
        assert!("free".parse::<BillingMode>().is_err());
        assert_eq!(BillingMode::default(), BillingMode::Disabled);
    }
}
