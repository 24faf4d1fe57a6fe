//! PostgreSQL implementation of ApiKeyRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::PgPool;
use uuid::Uuid;

use super::{int8, parse_column, unsigned};
use crate::domain::catalog::ApiKey;
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{ApiKeyId, DomainError, ErrorCode, Timestamp};
use crate::ports::ApiKeyRepository;

#[derive(Clone)]
pub struct PostgresApiKeyRepository {
    pool: PgPool,
}

impl PostgresApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ApiKeyRow {
    id: Uuid,
    provider: String,
    name: String,
    secret: String,
    is_active: bool,
    usage_count: i64,
    usage_limit: Option<i64>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ApiKeyRow> for ApiKey {
    type Error = DomainError;

    fn try_from(row: ApiKeyRow) -> Result<Self, Self::Error> {
        Ok(ApiKey {
            id: ApiKeyId::from_uuid(row.id),
            provider: parse_column("provider", &row.provider)?,
            name: row.name,
            secret: Secret::new(row.secret),
            is_active: row.is_active,
            usage_count: unsigned("usage_count", row.usage_count)?,
            usage_limit: row
                .usage_limit
                .map(|limit| unsigned("usage_limit", limit))
                .transpose()?,
            last_used_at: row.last_used_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const KEY_COLUMNS: &str =
    "id, provider, name, secret, is_active, usage_count, usage_limit, last_used_at, created_at";

#[async_trait]
impl ApiKeyRepository for PostgresApiKeyRepository {
    async fn list(&self, provider: Option<ProviderKind>) -> Result<Vec<ApiKey>, DomainError> {
        let rows: Vec<ApiKeyRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM api_keys
            WHERE $1::text IS NULL OR provider = $1
            ORDER BY created_at ASC
            "#,
            KEY_COLUMNS
        ))
        .bind(provider.map(|p| p.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(ApiKey::try_from).collect()
    }

    async fn find(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let row: Option<ApiKeyRow> =
            sqlx::query_as(&format!("SELECT {} FROM api_keys WHERE id = $1", KEY_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(DomainError::database)?;

        row.map(ApiKey::try_from).transpose()
    }

    async fn create(&self, key: &ApiKey) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys
                (id, provider, name, secret, is_active, usage_count, usage_limit, last_used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(key.id.as_uuid())
        .bind(key.provider.as_str())
        .bind(&key.name)
        .bind(key.secret.expose_secret())
        .bind(key.is_active)
        .bind(int8(key.usage_count))
        .bind(key.usage_limit.map(int8))
        .bind(key.last_used_at.map(|t| *t.as_datetime()))
        .bind(key.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;
        Ok(())
    }

    async fn update(&self, key: &ApiKey) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE api_keys
            SET name = $2, secret = $3, is_active = $4, usage_limit = $5
            WHERE id = $1
            "#,
        )
        .bind(key.id.as_uuid())
        .bind(&key.name)
        .bind(key.secret.expose_secret())
        .bind(key.is_active)
        .bind(key.usage_limit.map(int8))
        .execute(&self.pool)
        .await
        .map_err(DomainError::database)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::ApiKeyNotFound, "API key not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(DomainError::database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_use(&self, id: &ApiKeyId, at: Timestamp) -> Result<(), DomainError> {
        sqlx::query("UPDATE api_keys SET usage_count = usage_count + 1, last_used_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at.as_datetime())
            .execute(&self.pool)
            .await
            .map_err(DomainError::database)?;
        Ok(())
    }

    async fn reset_usage(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE api_keys SET usage_count = 0 WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(DomainError::database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ApiKeyRow {
        ApiKeyRow {
            id: Uuid::new_v4(),
            provider: "openrouter".to_string(),
            name: "primary".to_string(),
            secret: "sk-or-v1-0123456789".to_string(),
            is_active: true,
            usage_count: 4,
            usage_limit: Some(10),
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_and_keeps_secret() {
        let key = ApiKey::try_from(row()).unwrap();
        assert_eq!(key.provider, ProviderKind::OpenRouter);
        assert_eq!(key.secret.expose_secret(), "sk-or-v1-0123456789");
        assert_eq!(key.usage_limit, Some(10));
        assert!(key.is_usable());
    }

    #[test]
    fn negative_limit_is_rejected() {
        let mut bad = row();
        bad.usage_limit = Some(-1);
        assert!(ApiKey::try_from(bad).is_err());
    }
}
