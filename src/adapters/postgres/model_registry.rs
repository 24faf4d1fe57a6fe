//! PostgreSQL implementation of ModelRegistry.
//!
//! `(provider, model_id)` is unique; plan gating is stored as a `uuid[]`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{int4, is_unique_violation, parse_column, unsigned};
use crate::domain::catalog::{AIModel, ModelPricing};
use crate::domain::chat::ProviderKind;
use crate::domain::foundation::{DomainError, ErrorCode, ModelId, PlanId, Timestamp};
use crate::ports::ModelRegistry;

#[derive(Clone)]
pub struct PostgresModelRegistry {
    pool: PgPool,
}

impl PostgresModelRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ModelRow {
    id: Uuid,
    provider: String,
    model_id: String,
    display_name: String,
    input_price_per_million: f64,
    output_price_per_million: f64,
    context_window: i32,
    plan_ids: Vec<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ModelRow> for AIModel {
    type Error = DomainError;

    fn try_from(row: ModelRow) -> Result<Self, Self::Error> {
        let pricing = ModelPricing::new(row.input_price_per_million, row.output_price_per_million)
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid pricing: {}", e))
            })?;

        Ok(AIModel {
            id: ModelId::from_uuid(row.id),
            provider: parse_column("provider", &row.provider)?,
            model_id: row.model_id,
            display_name: row.display_name,
            pricing,
            context_window: unsigned("context_window", row.context_window)?,
            plan_ids: row.plan_ids.into_iter().map(PlanId::from_uuid).collect(),
            is_active: row.is_active,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

const MODEL_COLUMNS: &str = "id, provider, model_id, display_name, input_price_per_million, \
     output_price_per_million, context_window, plan_ids, is_active, created_at";

fn plan_uuids(model: &AIModel) -> Vec<Uuid> {
    model.plan_ids.iter().map(|p| *p.as_uuid()).collect()
}

fn map_write_error(err: sqlx::Error, model: &AIModel) -> DomainError {
    if is_unique_violation(&err) {
        DomainError::new(
            ErrorCode::AlreadyExists,
            format!("Model {}/{} already exists", model.provider, model.model_id),
        )
    } else {
        DomainError::database(err)
    }
}

#[async_trait]
impl ModelRegistry for PostgresModelRegistry {
    async fn list(&self, active_only: bool) -> Result<Vec<AIModel>, DomainError> {
        let rows: Vec<ModelRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM ai_models
            WHERE is_active OR NOT $1
            ORDER BY provider, display_name
            "#,
            MODEL_COLUMNS
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::database)?;

        rows.into_iter().map(AIModel::try_from).collect()
    }

    async fn find(&self, id: &ModelId) -> Result<Option<AIModel>, DomainError> {
        let row: Option<ModelRow> =
            sqlx::query_as(&format!("SELECT {} FROM ai_models WHERE id = $1", MODEL_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(DomainError::database)?;

        row.map(AIModel::try_from).transpose()
    }

    async fn find_by_name(
        &self,
        provider: ProviderKind,
        model_id: &str,
    ) -> Result<Option<AIModel>, DomainError> {
        let row: Option<ModelRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ai_models WHERE provider = $1 AND model_id = $2",
            MODEL_COLUMNS
        ))
        .bind(provider.as_str())
        .bind(model_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::database)?;

        row.map(AIModel::try_from).transpose()
    }

    async fn has_models_for(&self, provider: ProviderKind) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM ai_models WHERE provider = $1)")
            .bind(provider.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(DomainError::database)
    }

    async fn create(&self, model: &AIModel) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ai_models
                (id, provider, model_id, display_name, input_price_per_million,
                 output_price_per_million, context_window, plan_ids, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(model.id.as_uuid())
        .bind(model.provider.as_str())
        .bind(&model.model_id)
        .bind(&model.display_name)
        .bind(model.pricing.input_per_million)
        .bind(model.pricing.output_per_million)
        .bind(int4(model.context_window))
        .bind(plan_uuids(model))
        .bind(model.is_active)
        .bind(model.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, model))?;
        Ok(())
    }

    async fn update(&self, model: &AIModel) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE ai_models
            SET provider = $2, model_id = $3, display_name = $4, input_price_per_million = $5,
                output_price_per_million = $6, context_window = $7, plan_ids = $8, is_active = $9
            WHERE id = $1
            "#,
        )
        .bind(model.id.as_uuid())
        .bind(model.provider.as_str())
        .bind(&model.model_id)
        .bind(&model.display_name)
        .bind(model.pricing.input_per_million)
        .bind(model.pricing.output_per_million)
        .bind(int4(model.context_window))
        .bind(plan_uuids(model))
        .bind(model.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, model))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::ModelNotFound, "Model not found"));
        }
        Ok(())
    }

    async fn delete(&self, id: &ModelId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM ai_models WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(DomainError::database)?;
        Ok(result.rows_affected() > 0)
    }
}
