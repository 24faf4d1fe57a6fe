//! PostgreSQL implementation of UsageRepository.
//!
//! One row per (user, day). Recording is a single additive upsert, so
//! concurrent requests for the same user never lose counts. Reservations
//! are a conditional upsert: the row lock taken by `ON CONFLICT` serialises
//! racing sends and the `WHERE` clause refuses the one past the limit.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::unsigned;
use crate::domain::foundation::{DomainError, UserId};
use crate::domain::usage::{DailyUsage, UsageDelta};
use crate::ports::UsageRepository;

#[derive(Clone)]
pub struct PostgresUsageRepository {
    pool: PgPool,
}

impl PostgresUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UsageRow {
    user_id: Uuid,
    usage_date: NaiveDate,
    message_count: i64,
    prompt_tokens: i64,
    completion_tokens: i64,
    cost_usd: f64,
}

impl TryFrom<UsageRow> for DailyUsage {
    type Error = DomainError;

    fn try_from(row: UsageRow) -> Result<Self, Self::Error> {
        Ok(DailyUsage {
            user_id: UserId::from_uuid(row.user_id),
            date: row.usage_date,
            message_count: unsigned("message_count", row.message_count)?,
            prompt_tokens: unsigned("prompt_tokens", row.prompt_tokens)?,
            completion_tokens: unsigned("completion_tokens", row.completion_tokens)?,
            cost_usd: row.cost_usd,
        })
    }
}

const USAGE_COLUMNS: &str =
    "user_id, usage_date, message_count, prompt_tokens, completion_tokens, cost_usd";

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn get_for_day(&self, user: &UserId, date: NaiveDate) -> Result<DailyUsage, DomainError> {
        let row: Option<UsageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_usage WHERE user_id = $1 AND usage_date = $2",
            USAGE_COLUMNS
        ))
        .bind(user.as_uuid())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        match row {
            Some(row) => DailyUsage::try_from(row),
            None => Ok(DailyUsage::empty(*user, date)),
        }
    }

    async fn record(
        &self,
        user: &UserId,
        date: NaiveDate,
        delta: UsageDelta,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO user_usage
                (user_id, usage_date, message_count, prompt_tokens, completion_tokens, cost_usd)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, usage_date) DO UPDATE SET
                message_count = user_usage.message_count + EXCLUDED.message_count,
                prompt_tokens = user_usage.prompt_tokens + EXCLUDED.prompt_tokens,
                completion_tokens = user_usage.completion_tokens + EXCLUDED.completion_tokens,
                cost_usd = user_usage.cost_usd + EXCLUDED.cost_usd
            "#,
        )
        .bind(user.as_uuid())
        .bind(date)
        .bind(i64::from(delta.messages))
        .bind(i64::from(delta.prompt_tokens))
        .bind(i64::from(delta.completion_tokens))
        .bind(delta.cost_usd)
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;
        Ok(())
    }

    async fn reserve_message(
        &self,
        user: &UserId,
        date: NaiveDate,
        limit: Option<u32>,
    ) -> Result<Option<u32>, DomainError> {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO user_usage
                (user_id, usage_date, message_count, prompt_tokens, completion_tokens, cost_usd)
            SELECT $1, $2, 1, 0, 0, 0
            WHERE $3::BIGINT IS NULL OR $3 > 0
            ON CONFLICT (user_id, usage_date) DO UPDATE SET
                message_count = user_usage.message_count + 1
            WHERE $3::BIGINT IS NULL OR user_usage.message_count < $3
            RETURNING message_count
            "#,
        )
        .bind(user.as_uuid())
        .bind(date)
        .bind(limit.map(i64::from))
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        count.map(|c| unsigned("message_count", c)).transpose()
    }

    async fn release_message(&self, user: &UserId, date: NaiveDate) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE user_usage
            SET message_count = GREATEST(message_count - 1, 0)
            WHERE user_id = $1 AND usage_date = $2
            "#,
        )
        .bind(user.as_uuid())
        .bind(date)
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;
        Ok(())
    }

    async fn history(
        &self,
        user: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsage>, DomainError> {
        let rows: Vec<UsageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM user_usage
            WHERE user_id = $1 AND usage_date BETWEEN $2 AND $3
            ORDER BY usage_date ASC
            "#,
            USAGE_COLUMNS
        ))
        .bind(user.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(DailyUsage::try_from).collect()
    }
}
