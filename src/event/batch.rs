use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

use super::{Envelope, MAX_BATCH_SIZE};

/// Metadata accompanying a batch request; `batch_size` must equal
/// `batch.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub sdk_version: String,
    pub sdk_integration: String,
    pub sdk_name: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub batch_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl BatchMetadata {
    pub fn new(batch_size: usize) -> Self {
        Self {
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
            sdk_integration: env!("CARGO_PKG_NAME").to_string(),
            sdk_name: env!("CARGO_PKG_NAME").to_string(),
            timestamp: Utc::now().timestamp(),
            batch_size,
            client_id: None,
        }
    }
}

/// `{batch: [envelope...], metadata: {...}}`. Invariant: `1 <= batch.len() <=
/// MAX_BATCH_SIZE` and `metadata.batch_size == batch.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub batch: Vec<Envelope>,
    pub metadata: BatchMetadata,
}

impl BatchRequest {
    /// Build a batch request from a contiguous slice of envelopes, enforcing
    /// the ingestion endpoint's batch size limit.
    pub fn new(batch: Vec<Envelope>) -> Result<Self, Error> {
        if batch.is_empty() {
            return Err(Error::Validation("batch must contain at least one event".into()));
        }
        if batch.len() > MAX_BATCH_SIZE {
            return Err(Error::BatchSizeExceeded {
                size: batch.len(),
                max_size: MAX_BATCH_SIZE,
            });
        }
        let metadata = BatchMetadata::new(batch.len());
        Ok(Self { batch, metadata })
    }
}

/// Per-event failure detail returned in a [`BatchResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionError {
    pub id: String,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub events_processed: usize,
    pub events_skipped: usize,
    pub events_failed: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<IngestionError>,
    #[serde(default)]
    pub usage: UsageStats,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl BatchResponse {
    /// Full acceptance: `success == true` and no per-event errors.
    pub fn is_full_success(&self) -> bool {
        self.success && self.errors.is_empty()
    }

    /// Whether the response carries per-event failure detail, independent of
    /// the top-level `success` flag.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
