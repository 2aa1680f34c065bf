//! Error types for the ingestion pipeline.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Authentication failure reported by the ingestion endpoint.
    #[error("authentication failed: {message}")]
    Auth {
        message: String,
        request_id: Option<String>,
    },

    /// Rate limit reported by the ingestion endpoint.
    #[error("rate limit exceeded (retry after {retry_after:?})")]
    RateLimit {
        retry_after: Option<Duration>,
        request_id: Option<String>,
    },

    /// Server error (5xx) from the ingestion endpoint.
    #[error("server error (status {status}): {message}")]
    Server {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// Client error (4xx, other than auth/rate-limit) from the ingestion endpoint.
    #[error("client error (status {status}): {message}")]
    Client {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    /// Partial failure in a batch submission (HTTP 207).
    #[error("partial batch failure: {success_count} succeeded, {failure_count} failed")]
    PartialFailure {
        success_count: usize,
        failure_count: usize,
        errors: Vec<EventError>,
        success_ids: Vec<String>,
    },

    /// A single batch exceeded `MAX_BATCH_SIZE`.
    #[error("batch size exceeded: {size} (max: {max_size})")]
    BatchSizeExceeded { size: usize, max_size: usize },

    /// Enqueue or SubmitWork was called after the queue was marked closed.
    #[error("queue is closed")]
    Closed,

    /// SubmitWork was called while the worker pool's channel was full.
    #[error("work queue is full")]
    Capacity,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error detail for a single event within a batch response.
#[derive(Debug, Clone)]
pub struct EventError {
    pub event_id: String,
    pub message: String,
    pub code: Option<String>,
    pub retryable: bool,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event {} failed: {}", self.event_id, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        if self.retryable {
            write!(f, " [retryable]")?;
        }
        Ok(())
    }
}

impl Error {
    /// Whether a batch-level retry should be attempted for this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::RateLimit { .. } => true,
            Error::Server { .. } => true,
            Error::PartialFailure { .. } => true,
            Error::Auth { .. } => false,
            Error::Client { .. } => false,
            Error::Validation(_) => false,
            Error::Serialization(_) => false,
            Error::Configuration(_) => false,
            Error::BatchSizeExceeded { .. } => false,
            Error::Closed => false,
            Error::Capacity => false,
        }
    }

    /// Server-suggested (or default) delay before the next retry.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            Error::Server { .. } => Some(Duration::from_secs(5)),
            Error::Network(_) => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::Auth { request_id, .. }
            | Error::RateLimit { request_id, .. }
            | Error::Server { request_id, .. }
            | Error::Client { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}
