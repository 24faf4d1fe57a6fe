//! PostgreSQL implementation of BillingRepository.
//!
//! Credit changes are single statements so concurrent debits and webhook
//! grants cannot interleave into a negative balance. Stripe payments run in
//! one database transaction whose first statement claims the reference, so
//! a racing duplicate delivery blocks on the unique index and then finds
//! the claim taken.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::{int4, parse_column, unsigned};
use crate::domain::billing::{PaymentTransaction, SubscriptionPlan, UserCredits, UserSubscription};
use crate::domain::foundation::{
    DomainError, ErrorCode, PlanId, SubscriptionId, Timestamp, TransactionId, UserId,
};
use crate::ports::{BillingRepository, PlanRemoval};

#[derive(Clone)]
pub struct PostgresBillingRepository {
    pool: PgPool,
}

impl PostgresBillingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Rows
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i64,
    currency: String,
    billing_interval: String,
    daily_message_limit: Option<i32>,
    monthly_credits: i64,
    stripe_price_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for SubscriptionPlan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionPlan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            currency: row.currency,
            interval: parse_column("billing_interval", &row.billing_interval)?,
            daily_message_limit: row
                .daily_message_limit
                .map(|limit| unsigned("daily_message_limit", limit))
                .transpose()?,
            monthly_credits: row.monthly_credits,
            stripe_price_id: row.stripe_price_id,
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    status: String,
    stripe_subscription_id: Option<String>,
    current_period_start: DateTime<Utc>,
    current_period_end: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for UserSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(UserSubscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            status: parse_column("status", &row.status)?,
            stripe_subscription_id: row.stripe_subscription_id,
            current_period_start: Timestamp::from_datetime(row.current_period_start),
            current_period_end: Timestamp::from_datetime(row.current_period_end),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CreditsRow {
    user_id: Uuid,
    balance: i64,
    lifetime_purchased: i64,
    updated_at: DateTime<Utc>,
}

impl From<CreditsRow> for UserCredits {
    fn from(row: CreditsRow) -> Self {
        UserCredits {
            user_id: UserId::from_uuid(row.user_id),
            balance: row.balance,
            lifetime_purchased: row.lifetime_purchased,
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    amount_cents: i64,
    currency: String,
    credits: i64,
    status: String,
    stripe_reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for PaymentTransaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            kind: parse_column("kind", &row.kind)?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            credits: row.credits,
            status: parse_column("status", &row.status)?,
            stripe_reference: row.stripe_reference,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const PLAN_COLUMNS: &str = "id, name, description, price_cents, currency, billing_interval, \
     daily_message_limit, monthly_credits, stripe_price_id, is_active, created_at";
const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, status, stripe_subscription_id, \
     current_period_start, current_period_end, created_at, updated_at";
const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, amount_cents, currency, credits, status, stripe_reference, created_at";

fn daily_limit(plan: &SubscriptionPlan) -> Option<i32> {
    plan.daily_message_limit.map(int4)
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    // ════════════════════════════════════════════════════════════════════════
    // Plans
    // ════════════════════════════════════════════════════════════════════════

    async fn list_plans(&self, active_only: bool) -> Result<Vec<SubscriptionPlan>, DomainError> {
        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM subscription_plans
            WHERE is_active OR NOT $1
            ORDER BY price_cents ASC, name ASC
            "#,
            PLAN_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(SubscriptionPlan::try_from).collect()
    }

    async fn find_plan(&self, id: &PlanId) -> Result<Option<SubscriptionPlan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1",
            PLAN_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(SubscriptionPlan::try_from).transpose()
    }

    async fn create_plan(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_plans
                (id, name, description, price_cents, currency, billing_interval,
                 daily_message_limit, monthly_credits, stripe_price_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(plan.id.as_uuid())
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price_cents)
        .bind(&plan.currency)
        .bind(plan.interval.as_str())
        .bind(daily_limit(plan))
        .bind(plan.monthly_credits)
        .bind(&plan.stripe_price_id)
        .bind(plan.is_active)
        .bind(plan.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;
        Ok(())
    }

    async fn update_plan(&self, plan: &SubscriptionPlan) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_plans
            SET name = $2, description = $3, price_cents = $4, currency = $5,
                billing_interval = $6, daily_message_limit = $7, monthly_credits = $8,
                stripe_price_id = $9, is_active = $10
            WHERE id = $1
            "#,
        )
        .bind(plan.id.as_uuid())
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price_cents)
        .bind(&plan.currency)
        .bind(plan.interval.as_str())
        .bind(daily_limit(plan))
        .bind(plan.monthly_credits)
        .bind(&plan.stripe_price_id)
        .bind(plan.is_active)
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::PlanNotFound, "Plan not found"));
        }
        Ok(())
    }

    async fn remove_plan(&self, id: &PlanId) -> Result<PlanRemoval, DomainError> {
        let mut tx = self.pool.begin().await.map_err(DomainError::database)?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM subscription_plans WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(DomainError::database)?;
        if locked.is_none() {
            return Ok(PlanRemoval::NotFound);
        }

        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM user_subscriptions WHERE plan_id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&mut *tx)
                .await
                .map_err(DomainError::database)?;

        let removal = if in_use {
            sqlx::query("UPDATE subscription_plans SET is_active = false WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(DomainError::database)?;
            PlanRemoval::Deactivated
        } else {
            sqlx::query("DELETE FROM subscription_plans WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(DomainError::database)?;
            PlanRemoval::Deleted
        };

        tx.commit().await.map_err(DomainError::database)?;
        Ok(removal)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Subscriptions
    // ════════════════════════════════════════════════════════════════════════

    async fn current_subscription(
        &self,
        user: &UserId,
        now: Timestamp,
    ) -> Result<Option<UserSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM user_subscriptions
            WHERE user_id = $1
              AND status IN ('active', 'past_due')
              AND current_period_end > $2
            ORDER BY current_period_end DESC
            LIMIT 1
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user.as_uuid())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(UserSubscription::try_from).transpose()
    }

    async fn find_subscription_by_stripe_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Option<UserSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_subscriptions WHERE stripe_subscription_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(stripe_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(UserSubscription::try_from).transpose()
    }

    async fn save_subscription(&self, subscription: &UserSubscription) -> Result<(), DomainError> {
        upsert_subscription(&self.pool, subscription).await
    }

    // ════════════════════════════════════════════════════════════════════════
    // Credits
    // ════════════════════════════════════════════════════════════════════════

    async fn credits(&self, user: &UserId) -> Result<UserCredits, DomainError> {
        let row: Option<CreditsRow> = sqlx::query_as(
            "SELECT user_id, balance, lifetime_purchased, updated_at FROM user_credits WHERE user_id = $1",
        )
        .bind(user.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        Ok(row.map(UserCredits::from).unwrap_or_else(|| UserCredits::empty(*user)))
    }

    async fn adjust_credits(
        &self,
        user: &UserId,
        amount: i64,
        purchased: bool,
    ) -> Result<UserCredits, DomainError> {
        add_credits(&self.pool, user, amount, purchased).await
    }

    async fn try_debit(&self, user: &UserId, amount: i64) -> Result<bool, DomainError> {
        if amount <= 0 {
            return Ok(true);
        }
        let result = sqlx::query(
            r#"
            UPDATE user_credits
            SET balance = balance - $2, updated_at = $3
            WHERE user_id = $1 AND balance >= $2
            "#,
        )
        .bind(user.as_uuid())
        .bind(amount)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;
        Ok(result.rows_affected() == 1)
    }

    // ════════════════════════════════════════════════════════════════════════
    // Transactions
    // ════════════════════════════════════════════════════════════════════════

    async fn record_transaction(&self, tx: &PaymentTransaction) -> Result<bool, DomainError> {
        insert_transaction(&self.pool, tx).await
    }

    async fn transaction_exists(&self, stripe_reference: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payment_transactions WHERE stripe_reference = $1)",
        )
        .bind(stripe_reference)
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::database)
    }

    async fn apply_payment(
        &self,
        tx: &PaymentTransaction,
        subscriptions: &[UserSubscription],
    ) -> Result<Option<UserCredits>, DomainError> {
        let mut db = self.pool.begin().await.map_err(DomainError::database)?;

        // Dropping `db` rolls back, so a duplicate leaves nothing behind.
        if !insert_transaction(&mut *db, tx).await? {
            return Ok(None);
        }
        for subscription in subscriptions {
            upsert_subscription(&mut *db, subscription).await?;
        }
        let credits = add_credits(&mut *db, &tx.user_id, tx.credits, true).await?;

        db.commit().await.map_err(DomainError::database)?;
        Ok(Some(credits))
    }

    async fn list_transactions(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<PaymentTransaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM payment_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(user.as_uuid())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(PaymentTransaction::try_from).collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Statements shared by the pool and payment transactions
// ════════════════════════════════════════════════════════════════════════════

async fn upsert_subscription<'e>(
    db: impl PgExecutor<'e>,
    subscription: &UserSubscription,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO user_subscriptions
            (id, user_id, plan_id, status, stripe_subscription_id,
             current_period_start, current_period_end, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE SET
            plan_id = EXCLUDED.plan_id,
            status = EXCLUDED.status,
            stripe_subscription_id = EXCLUDED.stripe_subscription_id,
            current_period_start = EXCLUDED.current_period_start,
            current_period_end = EXCLUDED.current_period_end,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.user_id.as_uuid())
    .bind(subscription.plan_id.as_uuid())
    .bind(subscription.status.as_str())
    .bind(&subscription.stripe_subscription_id)
    .bind(subscription.current_period_start.as_datetime())
    .bind(subscription.current_period_end.as_datetime())
    .bind(subscription.created_at.as_datetime())
    .bind(subscription.updated_at.as_datetime())
    .execute(db)
    .await
    .map_err(DomainError::database)?;
    Ok(())
}

async fn add_credits<'e>(
    db: impl PgExecutor<'e>,
    user: &UserId,
    amount: i64,
    purchased: bool,
) -> Result<UserCredits, DomainError> {
    let purchased_amount = if purchased && amount > 0 { amount } else { 0 };

    let row: CreditsRow = sqlx::query_as(
        r#"
        INSERT INTO user_credits (user_id, balance, lifetime_purchased, updated_at)
        VALUES ($1, GREATEST($2, 0), $3, $4)
        ON CONFLICT (user_id) DO UPDATE SET
            balance = GREATEST(user_credits.balance + $2, 0),
            lifetime_purchased = user_credits.lifetime_purchased + $3,
            updated_at = $4
        RETURNING user_id, balance, lifetime_purchased, updated_at
        "#,
    )
    .bind(user.as_uuid())
    .bind(amount)
    .bind(purchased_amount)
    .bind(Timestamp::now().as_datetime())
    .fetch_one(db)
    .await
    .map_err(DomainError::database)?;

    Ok(row.into())
}

/// False when the reference is already recorded. NULL references never
/// conflict, so manual adjustments always insert.
async fn insert_transaction<'e>(
    db: impl PgExecutor<'e>,
    tx: &PaymentTransaction,
) -> Result<bool, DomainError> {
    let result = sqlx::query(
        r#"
        INSERT INTO payment_transactions
            (id, user_id, kind, amount_cents, currency, credits, status, stripe_reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (stripe_reference) DO NOTHING
        "#,
    )
    .bind(tx.id.as_uuid())
    .bind(tx.user_id.as_uuid())
    .bind(tx.kind.as_str())
    .bind(tx.amount_cents)
    .bind(&tx.currency)
    .bind(tx.credits)
    .bind(tx.status.as_str())
    .bind(&tx.stripe_reference)
    .bind(tx.created_at.as_datetime())
    .execute(db)
    .await
    .map_err(DomainError::database)?;
    Ok(result.rows_affected() == 1)
}
