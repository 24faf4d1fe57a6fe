//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! Every repository shares a `PgPool`. The schema is owned outside this
//! service; column names are listed next to each row struct.
//!
//! - `PostgresUserRepository` - accounts
//! - `PostgresConversationRepository` - conversations and messages
//! - `PostgresUsageRepository` - additive per-day counters
//! - `PostgresApiKeyRepository`, `PostgresSettingRepository`, `PostgresModelRegistry`
//! - `PostgresBillingRepository` - plans, subscriptions, credits, transactions
//! - `PostgresAnalyticsReader` - dashboard aggregates

mod analytics_reader;
mod api_key_repository;
mod billing_repository;
mod conversation_repository;
mod model_registry;
mod setting_repository;
mod usage_repository;
mod user_repository;

pub use analytics_reader::PostgresAnalyticsReader;
pub use api_key_repository::PostgresApiKeyRepository;
pub use billing_repository::PostgresBillingRepository;
pub use conversation_repository::PostgresConversationRepository;
pub use model_registry::PostgresModelRegistry;
pub use setting_repository::PostgresSettingRepository;
pub use usage_repository::PostgresUsageRepository;
pub use user_repository::PostgresUserRepository;

use std::fmt::Display;
use std::str::FromStr;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Parses a text column into a domain enum.
fn parse_column<T>(column: &str, value: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse::<T>().map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value '{}': {}", column, value, e),
        )
    })
}

/// Converts a signed counter column into an unsigned domain value.
fn unsigned<T, S>(column: &str, value: S) -> Result<T, DomainError>
where
    T: TryFrom<S>,
    S: Copy + Display,
{
    T::try_from(value).map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, value),
        )
    })
}

/// Saturating conversion for `int` columns.
fn int4(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Saturating conversion for `bigint` columns.
fn int8(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::{MessageRole, ProviderKind};

    #[test]
    fn parse_column_reads_enums() {
        assert_eq!(
            parse_column::<MessageRole>("role", "assistant").unwrap(),
            MessageRole::Assistant
        );
        assert_eq!(
            parse_column::<ProviderKind>("provider", "openrouter").unwrap(),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn parse_column_reports_bad_values_as_database_errors() {
        let err = parse_column::<MessageRole>("role", "robot").unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("role"));
    }

    #[test]
    fn unsigned_rejects_negative_counters() {
        assert_eq!(unsigned::<u32, i64>("message_count", 7).unwrap(), 7);
        assert!(unsigned::<u32, i64>("message_count", -1).is_err());
        assert!(unsigned::<u64, i64>("usage_count", -5).is_err());
    }
}
