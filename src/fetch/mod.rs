//! Stats API client with retry and backoff.
//!
//! Issues authenticated GET requests against the JSON:API upstream and
//! retries transient failures (429 and 5xx). Other statuses fail
//! immediately. The client keeps no state across calls apart from the
//! attempt counter inside a single logical request.

pub mod batch;

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Longest response-body prefix kept in a status error.
const ERROR_BODY_LIMIT: usize = 160;

/// Errors that can occur while talking to the upstream API.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error("API error {status}: {message}")]
    Status {
        status: u16,
        message: String,
        retry_after_secs: Option<f64>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// HTTP status of a status failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Rate limiting and server errors are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self.status(), Some(s) if is_retryable_status(s))
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Retry policy for upstream requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 400,
            jitter_ms: 150,
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (0-based).
    ///
    /// A non-negative `Retry-After` wins over exponential backoff.
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<f64>) -> Duration {
        if let Some(secs) = retry_after_secs.filter(|s| s.is_finite() && *s >= 0.0) {
            return Duration::from_millis((secs * 1000.0).ceil() as u64);
        }
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        } else {
            0
        };
        let exp = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(20));
        Duration::from_millis(exp.saturating_add(jitter))
    }
}

impl From<&ApiConfig> for RetryPolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.retry_max,
            base_delay_ms: config.retry_base_ms,
            jitter_ms: config.jitter_ms,
        }
    }
}

/// Source of upstream JSON documents.
///
/// `ApiClient` is the production implementation; tests substitute an
/// in-memory source.
#[async_trait]
pub trait JsonSource: Send + Sync {
    /// Fetch an authenticated API resource.
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;

    /// Fetch a public telemetry asset (no auth header, no retries).
    async fn fetch_telemetry(&self, url: &str) -> Result<Value, FetchError>;
}

/// HTTP client for the stats API.
pub struct ApiClient {
    client: Client,
    /// Unauthenticated client for telemetry assets
    telemetry_client: Client,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.api+json"),
        );
        match config.resolved_api_key() {
            Some(key) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|_| FetchError::InvalidApiKey)?;
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("PUBG_API_KEY not set; upstream requests will be rejected"),
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .build()?;
        let telemetry_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            telemetry_client,
            retry: RetryPolicy::from(config),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn attempt(&self, url: &str) -> Result<Value, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }
        Err(status_error(status, response).await)
    }
}

/// Build a status error from a failed response, keeping a body prefix.
async fn status_error(status: StatusCode, response: reqwest::Response) -> FetchError {
    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok());
    let text = response.text().await.unwrap_or_default();
    let message: String = text.chars().take(ERROR_BODY_LIMIT).collect();
    FetchError::Status {
        status: status.as_u16(),
        message,
        retry_after_secs,
    }
}

#[async_trait]
impl JsonSource for ApiClient {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let retry_after = match &e {
                        FetchError::Status {
                            retry_after_secs, ..
                        } => *retry_after_secs,
                        _ => None,
                    };
                    let delay = self.retry.delay_for(attempt, retry_after);
                    warn!(
                        "Upstream {} for {} (attempt {}/{}), retrying in {}ms",
                        e.status().unwrap_or_default(),
                        url,
                        attempt + 1,
                        self.retry.max_retries + 1,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Giving up on {} after {} attempt(s): {}", url, attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_telemetry(&self, url: &str) -> Result<Value, FetchError> {
        // Telemetry lives on a public CDN; the API bearer token must not leak there.
        let response = self.telemetry_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
