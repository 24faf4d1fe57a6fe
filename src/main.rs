//! chat-portal server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chat_portal::adapters::ai::registry_from_config;
use chat_portal::adapters::auth::JwtSessionValidator;
use chat_portal::adapters::http::{api_router, AppState};
use chat_portal::adapters::postgres::{
    PostgresAnalyticsReader, PostgresApiKeyRepository, PostgresBillingRepository,
    PostgresConversationRepository, PostgresModelRegistry, PostgresSettingRepository,
    PostgresUsageRepository, PostgresUserRepository,
};
use chat_portal::adapters::rate_limiter::{InMemoryRateLimiter, RateLimitConfig, RedisRateLimiter};
use chat_portal::config::{AppConfig, ServerConfig};
use chat_portal::ports::RateLimiter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    info!(
        environment = ?config.server.environment,
        addr = %config.server.socket_addr(),
        "starting chat-portal"
    );

    let pool = config.database.connect().await?;
    info!("database pool ready");

    let rate_limiter = build_rate_limiter(&config).await?;
    let providers = registry_from_config(&config.ai)?;

    let state = AppState {
        users: Arc::new(PostgresUserRepository::new(pool.clone())),
        conversations: Arc::new(PostgresConversationRepository::new(pool.clone())),
        usage: Arc::new(PostgresUsageRepository::new(pool.clone())),
        models: Arc::new(PostgresModelRegistry::new(pool.clone())),
        api_keys: Arc::new(PostgresApiKeyRepository::new(pool.clone())),
        settings: Arc::new(PostgresSettingRepository::new(pool.clone())),
        billing: Arc::new(PostgresBillingRepository::new(pool.clone())),
        analytics: Arc::new(PostgresAnalyticsReader::new(pool)),
        providers,
        session_validator: Arc::new(JwtSessionValidator::new(&config.auth)),
        rate_limiter,
        ai: Arc::new(config.ai.clone()),
        limits: config.limits.clone(),
        webhook_secret: config.payment.webhook_secret().map(str::to_string),
    };
    if state.webhook_secret.is_none() {
        warn!("payment webhook secret not set; Stripe webhooks will be refused");
    }

    let app = api_router(state, &config.server);
    let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).pretty().init();
    }
}

/// Redis when configured so limits hold across replicas; in-process otherwise.
async fn build_rate_limiter(
    config: &AppConfig,
) -> Result<Arc<dyn RateLimiter>, Box<dyn std::error::Error>> {
    let limits = RateLimitConfig::from_limits(&config.limits);
    match config.redis.url() {
        Some(url) => {
            let client = redis::Client::open(url)?;
            let conn = client.get_multiplexed_tokio_connection().await?;
            info!("rate limiter backed by redis");
            Ok(Arc::new(RedisRateLimiter::new(conn, limits)))
        }
        None => {
            warn!("redis not configured; rate limits are per process");
            Ok(Arc::new(InMemoryRateLimiter::new(limits)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
