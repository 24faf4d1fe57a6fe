//! Subscription plan administration.

use std::sync::Arc;
use tracing::info;

use super::AdminError;
use crate::domain::billing::{PlanDraft, SubscriptionPlan};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId};
use crate::ports::{BillingRepository, PlanRemoval};

pub struct PlanAdminHandler {
    billing: Arc<dyn BillingRepository>,
}

fn plan_not_found() -> DomainError {
    DomainError::new(ErrorCode::PlanNotFound, "Plan not found")
}

impl PlanAdminHandler {
    pub fn new(billing: Arc<dyn BillingRepository>) -> Self {
        Self { billing }
    }

    /// All plans, inactive included.
    pub async fn list(&self) -> Result<Vec<SubscriptionPlan>, AdminError> {
        Ok(self.billing.list_plans(false).await?)
    }

    pub async fn create(&self, draft: PlanDraft) -> Result<SubscriptionPlan, AdminError> {
        let plan = SubscriptionPlan::create(draft)?;
        self.billing.create_plan(&plan).await?;
        info!(plan_id = %plan.id, name = %plan.name, "plan created");
        Ok(plan)
    }

    pub async fn update(
        &self,
        id: &PlanId,
        draft: PlanDraft,
    ) -> Result<SubscriptionPlan, AdminError> {
        let mut plan = self.billing.find_plan(id).await?.ok_or_else(plan_not_found)?;
        plan.replace(draft)?;
        self.billing.update_plan(&plan).await?;
        Ok(plan)
    }

    /// Deletes the plan, or deactivates it when subscriptions reference it.
    pub async fn delete(&self, id: &PlanId) -> Result<PlanRemoval, AdminError> {
        match self.billing.remove_plan(id).await? {
            PlanRemoval::NotFound => Err(plan_not_found().into()),
            removal => {
                info!(plan_id = %id, ?removal, "plan removed");
                Ok(removal)
            }
        }
    }
}
