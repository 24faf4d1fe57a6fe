//! Transport plumbing shared by the HTTP provider adapters.

use reqwest::{header::RETRY_AFTER, Client, Response};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::AIError;

/// Used when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u32 = 30;

/// Endpoint and transport settings for one provider.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubles on each retry.
    pub backoff_base: Duration,
}

impl HttpSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn build_client(&self) -> Result<Client, AIError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AIError::Network(format!("failed to build HTTP client: {}", e)))
    }

    pub fn timeout_secs(&self) -> u32 {
        u32::try_from(self.timeout.as_secs()).unwrap_or(u32::MAX)
    }
}

/// Maps a reqwest transport failure.
pub fn send_error(e: reqwest::Error, settings: &HttpSettings) -> AIError {
    if e.is_timeout() {
        AIError::timeout(settings.timeout_secs())
    } else if e.is_connect() {
        AIError::Network(format!("connection failed: {}", e))
    } else {
        AIError::Network(e.to_string())
    }
}

/// Passes successful responses through and maps error statuses.
pub async fn check_status(response: Response) -> Result<Response, AIError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(status_error(status.as_u16(), retry_after, body))
}

pub fn status_error(status: u16, retry_after: Option<u32>, body: String) -> AIError {
    match status {
        401 | 403 => AIError::AuthenticationFailed,
        429 => AIError::rate_limited(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS)),
        400 | 404 | 422 => AIError::InvalidRequest(body),
        500..=599 => AIError::unavailable(format!("server error {}: {}", status, body)),
        _ => AIError::Network(format!("unexpected status {}: {}", status, body)),
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or retries run out.
///
/// Delays double from `backoff_base`: 1s, 2s, 4s with the default base.
pub async fn with_retries<T, F, Fut>(
    settings: &HttpSettings,
    provider: &str,
    mut attempt: F,
) -> Result<T, AIError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AIError>>,
{
    let mut retry = 0;
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry < settings.max_retries => {
                let delay = settings.backoff_base * 2u32.pow(retry);
                tracing::warn!(
                    provider,
                    error = %err,
                    retry = retry + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying completion request"
                );
                sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
