use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationError;

/// Body shared by `TraceCreate` and `TraceUpdate` events.
///
/// `end_time` is only meaningful on the Update variant, but is kept on one
/// struct rather than two near-identical ones, since Create and Update share
/// every other field.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TraceBody {
    pub id: String,
    pub name: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl TraceBody {
    /// Start building a trace body with only the required fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timestamp: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError {
                field: "body.id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.name.is_empty() {
            return Err(ValidationError {
                field: "body.name".into(),
                message: "must not be empty".into(),
            });
        }
        let Some(timestamp) = self.timestamp else {
            return Err(ValidationError {
                field: "body.timestamp".into(),
                message: "is required".into(),
            });
        };
        if let Some(end_time) = self.end_time {
            if end_time < timestamp {
                return Err(ValidationError {
                    field: "body.endTime".into(),
                    message: "must be >= timestamp".into(),
                });
            }
        }
        Ok(())
    }
}
