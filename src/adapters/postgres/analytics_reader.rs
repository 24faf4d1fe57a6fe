//! PostgreSQL implementation of AnalyticsReader.
//!
//! Aggregates come straight from `user_usage` except the per-model view,
//! which joins assistant messages to their conversation's route.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use super::parse_column;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{AnalyticsReader, DailyUsagePoint, ModelUsage, TopUser, UsageOverview};

#[derive(Clone)]
pub struct PostgresAnalyticsReader {
    pool: PgPool,
}

impl PostgresAnalyticsReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Aggregates are non-negative; a negative sum would mean corrupt rows.
fn count(value: i64) -> u64 {
    value.max(0) as u64
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    total_users: i64,
    active_users: i64,
    users_active_today: i64,
    total_conversations: i64,
    total_messages: i64,
    messages_today: i64,
    tokens_today: i64,
    cost_today_usd: f64,
    total_tokens: i64,
    total_cost_usd: f64,
}

impl From<OverviewRow> for UsageOverview {
    fn from(row: OverviewRow) -> Self {
        UsageOverview {
            total_users: count(row.total_users),
            active_users: count(row.active_users),
            users_active_today: count(row.users_active_today),
            total_conversations: count(row.total_conversations),
            total_messages: count(row.total_messages),
            messages_today: count(row.messages_today),
            tokens_today: count(row.tokens_today),
            cost_today_usd: row.cost_today_usd,
            total_tokens: count(row.total_tokens),
            total_cost_usd: row.total_cost_usd,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DailyRow {
    usage_date: NaiveDate,
    messages: i64,
    prompt_tokens: i64,
    completion_tokens: i64,
    cost_usd: f64,
    active_users: i64,
}

impl From<DailyRow> for DailyUsagePoint {
    fn from(row: DailyRow) -> Self {
        DailyUsagePoint {
            date: row.usage_date,
            messages: count(row.messages),
            prompt_tokens: count(row.prompt_tokens),
            completion_tokens: count(row.completion_tokens),
            cost_usd: row.cost_usd,
            active_users: count(row.active_users),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TopUserRow {
    user_id: Uuid,
    email: String,
    messages: i64,
    tokens: i64,
    cost_usd: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct ModelUsageRow {
    provider: String,
    model: String,
    messages: i64,
    prompt_tokens: i64,
    completion_tokens: i64,
    cost_usd: f64,
}

#[async_trait]
impl AnalyticsReader for PostgresAnalyticsReader {
    async fn overview(&self, today: NaiveDate) -> Result<UsageOverview, DomainError> {
        let row: OverviewRow = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE is_active) AS active_users,
                (SELECT COUNT(*) FROM user_usage
                    WHERE usage_date = $1 AND message_count > 0) AS users_active_today,
                (SELECT COUNT(*) FROM conversations) AS total_conversations,
                (SELECT COUNT(*) FROM messages) AS total_messages,
                COALESCE((SELECT SUM(message_count) FROM user_usage
                    WHERE usage_date = $1), 0)::BIGINT AS messages_today,
                COALESCE((SELECT SUM(prompt_tokens + completion_tokens) FROM user_usage
                    WHERE usage_date = $1), 0)::BIGINT AS tokens_today,
                COALESCE((SELECT SUM(cost_usd) FROM user_usage
                    WHERE usage_date = $1), 0)::FLOAT8 AS cost_today_usd,
                COALESCE((SELECT SUM(prompt_tokens + completion_tokens) FROM user_usage), 0)::BIGINT
                    AS total_tokens,
                COALESCE((SELECT SUM(cost_usd) FROM user_usage), 0)::FLOAT8 AS total_cost_usd
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::database)?;

        Ok(row.into())
    }

    async fn daily_usage(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyUsagePoint>, DomainError> {
        let rows: Vec<DailyRow> = sqlx::query_as(
            r#"
            SELECT
                usage_date,
                SUM(message_count)::BIGINT AS messages,
                SUM(prompt_tokens)::BIGINT AS prompt_tokens,
                SUM(completion_tokens)::BIGINT AS completion_tokens,
                SUM(cost_usd)::FLOAT8 AS cost_usd,
                COUNT(*) FILTER (WHERE message_count > 0) AS active_users
            FROM user_usage
            WHERE usage_date BETWEEN $1 AND $2
            GROUP BY usage_date
            ORDER BY usage_date ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        Ok(rows.into_iter().map(DailyUsagePoint::from).collect())
    }

    async fn top_users(&self, from: NaiveDate, limit: u32) -> Result<Vec<TopUser>, DomainError> {
        let rows: Vec<TopUserRow> = sqlx::query_as(
            r#"
            SELECT
                u.id AS user_id,
                u.email,
                SUM(uu.message_count)::BIGINT AS messages,
                SUM(uu.prompt_tokens + uu.completion_tokens)::BIGINT AS tokens,
                SUM(uu.cost_usd)::FLOAT8 AS cost_usd
            FROM user_usage uu
            JOIN users u ON u.id = uu.user_id
            WHERE uu.usage_date >= $1
            GROUP BY u.id, u.email
            ORDER BY messages DESC, u.email ASC
            LIMIT $2
            "#,
        )
        .bind(from)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        Ok(rows
            .into_iter()
            .map(|row| TopUser {
                user_id: UserId::from_uuid(row.user_id),
                email: row.email,
                messages: count(row.messages),
                tokens: count(row.tokens),
                cost_usd: row.cost_usd,
            })
            .collect())
    }

    async fn usage_by_model(&self, from: NaiveDate) -> Result<Vec<ModelUsage>, DomainError> {
        let rows: Vec<ModelUsageRow> = sqlx::query_as(
            r#"
            SELECT
                c.provider,
                c.model,
                COUNT(*) AS messages,
                COALESCE(SUM(m.prompt_tokens), 0)::BIGINT AS prompt_tokens,
                COALESCE(SUM(m.completion_tokens), 0)::BIGINT AS completion_tokens,
                COALESCE(SUM(m.cost_usd), 0)::FLOAT8 AS cost_usd
            FROM messages m
            JOIN conversations c ON c.id = m.conversation_id
            WHERE m.role = 'assistant'
              AND (m.created_at AT TIME ZONE 'UTC')::DATE >= $1
            GROUP BY c.provider, c.model
            ORDER BY messages DESC, c.model ASC
            "#,
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter()
            .map(|row| {
                Ok(ModelUsage {
                    provider: parse_column("provider", &row.provider)?,
                    model: row.model,
                    messages: count(row.messages),
                    prompt_tokens: count(row.prompt_tokens),
                    completion_tokens: count(row.completion_tokens),
                    cost_usd: row.cost_usd,
                })
            })
            .collect()
    }
}
