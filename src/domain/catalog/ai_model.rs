use serde::{Deserialize, Serialize};

use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{ModelId, PlanId, Timestamp, ValidationError};

/// Price of a model in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    pub fn new(input_per_million: f64, output_per_million: f64) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("input_price_per_million", input_per_million),
            ("output_price_per_million", output_per_million),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::invalid_format(field, "must be a non-negative number"));
            }
        }
        Ok(Self {
            input_per_million,
            output_per_million,
        })
    }

    /// Estimated cost in USD for one completion.
    pub fn cost(&self, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        f64::from(prompt_tokens) * self.input_per_million / 1_000_000.0
            + f64::from(completion_tokens) * self.output_per_million / 1_000_000.0
    }
}

/// Registry entry describing a model users may chat with.
///
/// An empty `plan_ids` list makes the model available to everyone;
/// otherwise the user needs a current subscription to one of the plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIModel {
    pub id: ModelId,
    pub provider: ProviderKind,
    pub model_id: String,
    pub display_name: String,
    pub pricing: ModelPricing,
    pub context_window: u32,
    pub plan_ids: Vec<PlanId>,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl AIModel {
    pub fn new(
        provider: ProviderKind,
        model_id: &str,
        display_name: &str,
        pricing: ModelPricing,
        context_window: u32,
        plan_ids: Vec<PlanId>,
    ) -> Result<Self, ValidationError> {
        let model_id = model_id.trim();
        if model_id.is_empty() {
            return Err(ValidationError::empty_field("model_id"));
        }
        let display_name = match display_name.trim() {
            "" => model_id,
            name => name,
        };
        Ok(Self {
            id: ModelId::new(),
            provider,
            model_id: model_id.to_string(),
            display_name: display_name.to_string(),
            pricing,
            context_window,
            plan_ids,
            is_active: true,
            created_at: Timestamp::now(),
        })
    }

    pub fn apply(&mut self, update: ModelUpdate) {
        if let Some(display_name) = update.display_name {
            let display_name = display_name.trim();
            self.display_name = if display_name.is_empty() {
                self.model_id.clone()
            } else {
                display_name.to_string()
            };
        }
        if let Some(pricing) = update.pricing {
            self.pricing = pricing;
        }
        if let Some(context_window) = update.context_window {
            self.context_window = context_window;
        }
        if let Some(plan_ids) = update.plan_ids {
            self.plan_ids = plan_ids;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
    }

    pub fn is_plan_gated(&self) -> bool {
        !self.plan_ids.is_empty()
    }

    /// Whether a user on `plan` (or none) may use this model.
    pub fn is_available_to(&self, plan: Option<&PlanId>) -> bool {
        if !self.is_active {
            return false;
        }
        match plan {
            _ if !self.is_plan_gated() => true,
            Some(plan) => self.plan_ids.contains(plan),
            None => false,
        }
    }
}

/// Partial edit of a registered model. Provider and model id are fixed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelUpdate {
    pub display_name: Option<String>,
    pub pricing: Option<ModelPricing>,
    pub context_window: Option<u32>,
    pub plan_ids: Option<Vec<PlanId>>,
    pub is_active: Option<bool>,
}
