//! The HTTP transport boundary: `SubmitBatch(events) -> response`.
//!
//! This is the one external collaborator the core depends on directly. The
//! [`Submitter`] trait is the contract; [`HttpSubmitter`] is the production
//! implementation that POSTs to Langfuse's ingestion endpoint. Anything
//! implementing the trait can stand in for tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, EventError};
use crate::event::{BatchRequest, BatchResponse, IngestionError, UsageStats};
use crate::security::SecretString;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
const SDK_NAME: &str = env!("CARGO_PKG_NAME");

/// The operation the core consumes: submit one batch, get one response.
///
/// Implementations must respect the caller's intent to cancel (by honoring
/// the `Drop` of the returned future, as all `async fn` do) and must return a
/// structured [`BatchResponse`] on HTTP 200/207; anything else is an error.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit_batch(&self, request: BatchRequest) -> Result<BatchResponse, Error>;
}

/// Configuration for [`HttpSubmitter`].
#[derive(Clone)]
pub struct HttpSubmitterConfig {
    pub public_key: SecretString,
    pub secret_key: SecretString,
    pub base_url: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl HttpSubmitterConfig {
    pub fn new(public_key: impl Into<SecretString>, secret_key: impl Into<SecretString>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
            base_url: "https://cloud.langfuse.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Production [`Submitter`]: POSTs the batch to `{base_url}/api/public/ingestion`.
pub struct HttpSubmitter {
    client: reqwest::Client,
    config: HttpSubmitterConfig,
}

impl HttpSubmitter {
    pub fn new(config: HttpSubmitterConfig) -> Result<Self, Error> {
        let user_agent = format!("{}/{} (Rust)", SDK_NAME, SDK_VERSION);
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(user_agent)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/public/ingestion",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit_batch(&self, request: BatchRequest) -> Result<BatchResponse, Error> {
        let response = self
            .client
            .post(self.endpoint())
            .basic_auth(
                self.config.public_key.expose_secret(),
                Some(self.config.secret_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(Error::Network)?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match status.as_u16() {
            200 | 201 | 202 => {
                let processed = request.batch.len();
                Ok(BatchResponse {
                    success: true,
                    errors: Vec::new(),
                    usage: UsageStats {
                        events_processed: processed,
                        events_skipped: 0,
                        events_failed: 0,
                    },
                    metadata: None,
                    timestamp: Some(chrono::Utc::now()),
                })
            }
            207 => {
                let body = response.text().await.map_err(Error::Network)?;
                parse_multi_status(&body, request.batch.len())
            }
            401 | 403 => Err(Error::Auth {
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "authentication failed".to_string()),
                request_id,
            }),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(Error::RateLimit {
                    retry_after,
                    request_id,
                })
            }
            500..=599 => Err(Error::Server {
                status: status.as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "server error".to_string()),
                request_id,
            }),
            _ => Err(Error::Client {
                status: status.as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("unexpected status: {status}")),
                request_id,
            }),
        }
    }
}

#[derive(serde::Deserialize)]
struct MultiStatusBody {
    #[serde(default)]
    successes: Vec<MultiStatusSuccess>,
    #[serde(default)]
    errors: Vec<MultiStatusError>,
}

#[derive(serde::Deserialize)]
struct MultiStatusSuccess {
    id: String,
    #[allow(dead_code)]
    status: Option<u16>,
}

#[derive(serde::Deserialize)]
struct MultiStatusError {
    id: String,
    status: Option<u16>,
    message: Option<String>,
    error: Option<String>,
}

/// Parse a 207 body shaped `{"successes": [...], "errors": [...]}`, the
/// ingestion endpoint's multi-status format.
fn parse_multi_status(body: &str, batch_len: usize) -> Result<BatchResponse, Error> {
    let parsed: MultiStatusBody = serde_json::from_str(body).map_err(Error::Serialization)?;
    let ingestion_errors: Vec<IngestionError> = parsed
        .errors
        .iter()
        .map(|e| IngestionError {
            id: e.id.clone(),
            status: e.status.unwrap_or(500),
            message: e
                .message
                .clone()
                .or_else(|| e.error.clone())
                .unwrap_or_else(|| "unknown error".to_string()),
            error_text: e.error.clone(),
            details: None,
            event_id: Some(e.id.clone()),
            event_type: None,
        })
        .collect();
    let failed = ingestion_errors.len();
    let processed = parsed.successes.len().max(batch_len.saturating_sub(failed));
    Ok(BatchResponse {
        success: ingestion_errors.is_empty(),
        errors: ingestion_errors,
        usage: UsageStats {
            events_processed: processed,
            events_skipped: 0,
            events_failed: failed,
        },
        metadata: None,
        timestamp: Some(chrono::Utc::now()),
    })
}

/// Convert per-event [`IngestionError`]s into the caller-facing [`EventError`]
/// shape used by hooks (retryable iff the reported status is 5xx or 429).
pub fn classify_errors(errors: &[IngestionError]) -> Vec<EventError> {
    errors
        .iter()
        .map(|e| EventError {
            event_id: e.event_id.clone().unwrap_or_else(|| e.id.clone()),
            message: e.message.clone(),
            code: Some(e.status.to_string()),
            retryable: e.status >= 500 || e.status == 429,
        })
        .collect()
}
