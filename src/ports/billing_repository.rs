//! Plans, subscriptions, credit balances and payment history.

use async_trait::async_trait;

use crate::domain::billing::{PaymentTransaction, SubscriptionPlan, UserCredits, UserSubscription};
use crate::domain::foundation::{DomainError, PlanId, Timestamp, UserId};

/// Outcome of removing a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanRemoval {
    Deleted,
    /// Subscriptions still reference the plan, so it was only deactivated.
    Deactivated,
    NotFound,
}

#[async_trait]
pub trait BillingRepository: Send + Sync {
    // Plans

    async fn list_plans(&self, active_only: bool) -> Result<Vec<SubscriptionPlan>, DomainError>;

    async fn find_plan(&self, id: &PlanId) -> Result<Option<SubscriptionPlan>, DomainError>;

    async fn create_plan(&self, plan: &SubscriptionPlan) -> Result<(), DomainError>;

    async fn update_plan(&self, plan: &SubscriptionPlan) -> Result<(), DomainError>;

    async fn remove_plan(&self, id: &PlanId) -> Result<PlanRemoval, DomainError>;

    // Subscriptions

    /// The subscription granting benefits at `now`, latest period end first.
    async fn current_subscription(
        &self,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Option<UserSubscription>, DomainError>;

    async fn find_subscription_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<UserSubscription>, DomainError>;

    /// Inserts or updates by id.
    async fn save_subscription(&self, subscription: &UserSubscription) -> Result<(), DomainError>;

    // Credits

    /// Balance row; zero balance when the user never had credits.
    async fn credits(&self, user: &UserId) -> Result<UserCredits, DomainError>;

    /// Adds (or with a negative amount removes) credits. Purchases also grow
    /// `lifetime_purchased`. The balance never drops below zero.
    async fn adjust_credits(
        &self,
        user: &UserId,
        amount: i64,
        purchased: bool,
    ) -> Result<UserCredits, DomainError>;

    /// Takes `amount` credits if the balance covers it. Returns false and
    /// changes nothing otherwise.
    async fn try_debit(&self, user: &UserId, amount: i64) -> Result<bool, DomainError>;

    // Transactions

    /// Returns false without writing when a transaction with the same
    /// `stripe_reference` already exists.
    async fn record_transaction(&self, tx: &PaymentTransaction) -> Result<bool, DomainError>;

    async fn transaction_exists(&self, stripe_reference: &str) -> Result<bool, DomainError>;

    /// Applies a Stripe payment all or nothing: inserts `tx`, saves
    /// `subscriptions` in order and adds `tx.credits` as purchased credits.
    ///
    /// Returns `None` and changes nothing when a transaction with the same
    /// `stripe_reference` exists, including one committed by a concurrent
    /// call. Otherwise returns the balance after the grant.
    async fn apply_payment(
        &self,
        tx: &PaymentTransaction,
        subscriptions: &[UserSubscription],
    ) -> Result<Option<UserCredits>, DomainError>;

    /// Newest first.
    async fn list_transactions(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentTransaction>, DomainError>;
}
