//! AI model registry administration.

use std::sync::Arc;
use tracing::info;

use super::AdminError;
use crate::domain::catalog::{AIModel, ModelPricing, ModelUpdate};
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{DomainError, ErrorCode, ModelId, PlanId};
use crate::ports::{BillingRepository, ModelRegistry};

#[derive(Debug, Clone)]
pub struct CreateModelCommand {
    pub provider: ProviderKind,
    pub model_id: String,
    pub display_name: String,
    pub pricing: ModelPricing,
    pub context_window: u32,
    pub plan_ids: Vec<PlanId>,
}

pub struct ModelAdminHandler {
    models: Arc<dyn ModelRegistry>,
    billing: Arc<dyn BillingRepository>,
}

fn model_not_found() -> DomainError {
    DomainError::new(ErrorCode::ModelNotFound, "Model not found")
}

impl ModelAdminHandler {
    pub fn new(models: Arc<dyn ModelRegistry>, billing: Arc<dyn BillingRepository>) -> Self {
        Self { models, billing }
    }

    pub async fn list(&self) -> Result<Vec<AIModel>, AdminError> {
        Ok(self.models.list(false).await?)
    }

    pub async fn create(&self, cmd: CreateModelCommand) -> Result<AIModel, AdminError> {
        self.ensure_plans_exist(&cmd.plan_ids).await?;
        let model = AIModel::new(
            cmd.provider,
            &cmd.model_id,
            &cmd.display_name,
            cmd.pricing,
            cmd.context_window,
            cmd.plan_ids,
        )?;
        self.models.create(&model).await?;
        info!(provider = %model.provider, model = %model.model_id, "model registered");
        Ok(model)
    }

    pub async fn update(&self, id: &ModelId, update: ModelUpdate) -> Result<AIModel, AdminError> {
        if let Some(plan_ids) = &update.plan_ids {
            self.ensure_plans_exist(plan_ids).await?;
        }
        let mut model = self.models.find(id).await?.ok_or_else(model_not_found)?;
        model.apply(update);
        self.models.update(&model).await?;
        Ok(model)
    }

    pub async fn delete(&self, id: &ModelId) -> Result<(), AdminError> {
        if !self.models.delete(id).await? {
            return Err(model_not_found().into());
        }
        info!(model_id = %id, "model removed");
        Ok(())
    }

    async fn ensure_plans_exist(&self, plan_ids: &[PlanId]) -> Result<(), AdminError> {
        for plan_id in plan_ids {
            if self.billing.find_plan(plan_id).await?.is_none() {
                return Err(DomainError::new(
                    ErrorCode::PlanNotFound,
                    format!("Plan {} not found", plan_id),
                )
                .with_detail("plan_id", plan_id.to_string())
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingRepository, InMemoryModelRegistry};
    use crate::domain::billing::{BillingInterval, PlanDraft, SubscriptionPlan};

    fn command(model_id: &str, plan_ids: Vec<PlanId>) -> CreateModelCommand {
        CreateModelCommand {
            provider: ProviderKind::OpenRouter,
            model_id: model_id.into(),
            display_name: String::new(),
            pricing: ModelPricing::new(0.15, 0.6).unwrap(),
            context_window: 128_000,
            plan_ids,
        }
    }

    fn handler(billing: InMemoryBillingRepository) -> ModelAdminHandler {
        ModelAdminHandler::new(Arc::new(InMemoryModelRegistry::new()), Arc::new(billing))
    }

    #[tokio::test]
    async fn duplicate_pair_conflicts() {
        let h = handler(InMemoryBillingRepository::new());
        let model = h.create(command("openai/gpt-4o-mini", vec![])).await.unwrap();
        assert_eq!(model.display_name, "openai/gpt-4o-mini");

        let err = h.create(command("openai/gpt-4o-mini", vec![])).await.unwrap_err();
        assert!(matches!(err, AdminError::Domain(e) if e.code == ErrorCode::AlreadyExists));
    }

    #[tokio::test]
    async fn plan_ids_must_exist() {
        let billing = InMemoryBillingRepository::new();
        let plan = SubscriptionPlan::create(PlanDraft {
            name: "Pro".into(),
            description: None,
            price_cents: 1000,
            currency: "usd".into(),
            interval: BillingInterval::Yearly,
            daily_message_limit: None,
            monthly_credits: 0,
            stripe_price_id: None,
            is_active: true,
        })
        .unwrap();
        billing.create_plan(&plan).await.unwrap();
        let h = handler(billing);

        let err = h.create(command("gated", vec![PlanId::new()])).await.unwrap_err();
        assert!(matches!(err, AdminError::Domain(e) if e.code == ErrorCode::PlanNotFound));

        let model = h.create(command("gated", vec![plan.id])).await.unwrap();
        assert!(model.is_plan_gated());
    }

    #[tokio::test]
    async fn update_changes_pricing_and_visibility() {
        let h = handler(InMemoryBillingRepository::new());
        let model = h.create(command("m", vec![])).await.unwrap();

        let updated = h
            .update(
                &model.id,
                ModelUpdate {
                    pricing: Some(ModelPricing::new(1.0, 3.0).unwrap()),
                    is_active: Some(false),
                    display_name: Some("Model M".into()),
                    ..ModelUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.pricing.output_per_million, 3.0);
        assert!(!updated.is_active);
        assert_eq!(updated.display_name, "Model M");
        assert_eq!(h.list().await.unwrap().len(), 1);

        h.delete(&model.id).await.unwrap();
        assert!(h.delete(&model.id).await.is_err());
        assert!(h.update(&model.id, ModelUpdate::default()).await.is_err());
    }
}
