//! In-memory plans, subscriptions, credits and transactions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::{PaymentTransaction, SubscriptionPlan, UserCredits, UserSubscription};
use crate::domain::foundation::{DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp, UserId};
use crate::ports::{BillingRepository, PlanRemoval};

#[derive(Debug, Default)]
struct Store {
    plans: HashMap<PlanId, SubscriptionPlan>,
    subscriptions: HashMap<SubscriptionId, UserSubscription>,
    credits: HashMap<UserId, UserCredits>,
    transactions: Vec<PaymentTransaction>,
}

impl Store {
    fn add_credits(&mut self, user: &UserId, amount: i64, purchased: bool) -> UserCredits {
        let credits = self
            .credits
            .entry(*user)
            .or_insert_with(|| UserCredits::empty(*user));
        credits.balance = (credits.balance + amount).max(0);
        if purchased && amount > 0 {
            credits.lifetime_purchased += amount;
        }
        credits.updated_at = Timestamp::now();
        credits.clone()
    }

    fn has_reference(&self, reference: &str) -> bool {
        self.transactions
            .iter()
            .any(|t| t.stripe_reference.as_deref() == Some(reference))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryBillingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscriptions_for(&self, user: &UserId) -> Vec<UserSubscription> {
        self.store
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BillingRepository for InMemoryBillingRepository {
    async fn list_plans(&self, active_only: bool) -> Result<Vec<SubscriptionPlan>, DomainError> {
        let mut plans: Vec<SubscriptionPlan> = self
            .store
            .read()
            .await
            .plans
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        plans.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then_with(|| a.name.cmp(&b.name)));
        Ok(plans)
    }

    async fn find_plan(&self, id: &PlanId) -> Result<Option<SubscriptionPlan>, DomainError> {
        Ok(self.store.read().await.plans.get(id).cloned())
    }

    async fn create_plan(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        self.store.write().await.plans.insert(plan.id, plan.clone());
        Ok(())
    }

    async fn update_plan(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        let mut store = self.store.write().await;
        let existing = store
            .plans
            .get_mut(&plan.id)
            .ok_or_else(|| DomainError::new(ErrorCode::PlanNotFound, "Plan not found"))?;
        *existing = plan.clone();
        Ok(())
    }

    async fn remove_plan(&self, id: &PlanId) -> Result<PlanRemoval, DomainError> {
        let mut store = self.store.write().await;
        if !store.plans.contains_key(id) {
            return Ok(PlanRemoval::NotFound);
        }
        if store.subscriptions.values().any(|s| &s.plan_id == id) {
            if let Some(plan) = store.plans.get_mut(id) {
                plan.is_active = false;
            }
            return Ok(PlanRemoval::Deactivated);
        }
        store.plans.remove(id);
        Ok(PlanRemoval::Deleted)
    }

    async fn current_subscription(
        &self,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Option<UserSubscription>, DomainError> {
        Ok(self
            .store
            .read()
            .await
            .subscriptions
            .values()
            .filter(|s| &s.user_id == user && s.is_current(&now))
            .max_by_key(|s| s.current_period_end)
            .cloned())
    }

    async fn find_subscription_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<UserSubscription>, DomainError> {
        Ok(self
            .store
            .read()
            .await
            .subscriptions
            .values()
            .find(|s| s.stripe_subscription_id.as_deref() == Some(stripe_subscription_id))
            .cloned())
    }

    async fn save_subscription(&self, subscription: &UserSubscription) -> Result<(), DomainError> {
        self.store
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn credits(&self, user: &UserId) -> Result<UserCredits, DomainError> {
        Ok(self
            .store
            .read()
            .await
            .credits
            .get(user)
            .cloned()
            .unwrap_or_else(|| UserCredits::empty(*user)))
    }

    async fn adjust_credits(
        &self,
        user: &UserId,
        amount: i64,
        purchased: bool,
    ) -> Result<UserCredits, DomainError> {
        Ok(self.store.write().await.add_credits(user, amount, purchased))
    }

    async fn try_debit(&self, user: &UserId, amount: i64) -> Result<bool, DomainError> {
        if amount <= 0 {
            return Ok(true);
        }
        let mut store = self.store.write().await;
        match store.credits.get_mut(user) {
            Some(credits) if credits.balance >= amount => {
                credits.balance -= amount;
                credits.updated_at = Timestamp::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_transaction(&self, tx: &PaymentTransaction) -> Result<bool, DomainError> {
        let mut store = self.store.write().await;
        if matches!(&tx.stripe_reference, Some(reference) if store.has_reference(reference)) {
            return Ok(false);
        }
        store.transactions.push(tx.clone());
        Ok(true)
    }

    async fn transaction_exists(&self, stripe_reference: &str) -> Result<bool, DomainError> {
        Ok(self.store.read().await.has_reference(stripe_reference))
    }

    async fn apply_payment(
        &self,
        tx: &PaymentTransaction,
        subscriptions: &[UserSubscription],
    ) -> Result<Option<UserCredits>, DomainError> {
        let mut store = self.store.write().await;
        if matches!(&tx.stripe_reference, Some(reference) if store.has_reference(reference)) {
            return Ok(None);
        }
        for subscription in subscriptions {
            store
                .subscriptions
                .insert(subscription.id, subscription.clone());
        }
        let credits = store.add_credits(&tx.user_id, tx.credits, true);
        store.transactions.push(tx.clone());
        Ok(Some(credits))
    }

    async fn list_transactions(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentTransaction>, DomainError> {
        let store = self.store.read().await;
        Ok(store
            .transactions
            .iter()
            .rev()
            .filter(|t| &t.user_id == user)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
