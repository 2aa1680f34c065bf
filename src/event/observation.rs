use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationError;

/// The observation's own category, distinct from the envelope's `EventType`
/// (a `GenerationCreate` envelope carries an `ObservationBody` with
/// `kind: Generation`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObservationKind {
    Span,
    Generation,
    Event,
}

/// Body shared by spans, generations, and events (`ObservationCreate`,
/// `ObservationUpdate`, `SpanCreate`, `SpanUpdate`, `GenerationCreate`,
/// `GenerationUpdate`, `EventCreate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationBody {
    pub id: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_observation_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ObservationKind,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl ObservationBody {
    pub fn new(
        id: impl Into<String>,
        trace_id: impl Into<String>,
        kind: ObservationKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            trace_id: trace_id.into(),
            parent_observation_id: None,
            kind,
            name: name.into(),
            start_time: Some(Utc::now()),
            end_time: None,
            completion_start_time: None,
            model: None,
            model_parameters: None,
            input: None,
            output: None,
            usage: None,
            level: None,
            status_message: None,
            version: None,
            metadata: None,
            environment: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError {
                field: "body.id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.trace_id.is_empty() {
            return Err(ValidationError {
                field: "body.traceId".into(),
                message: "is required".into(),
            });
        }
        if self.name.is_empty() {
            return Err(ValidationError {
                field: "body.name".into(),
                message: "must not be empty".into(),
            });
        }
        let Some(start_time) = self.start_time else {
            return Err(ValidationError {
                field: "body.startTime".into(),
                message: "is required".into(),
            });
        };
        if let Some(end_time) = self.end_time {
            if end_time < start_time {
                return Err(ValidationError {
                    field: "body.endTime".into(),
                    message: "must be >= startTime".into(),
                });
            }
        }
        if let Some(completion_start_time) = self.completion_start_time {
            if completion_start_time < start_time {
                return Err(ValidationError {
                    field: "body.completionStartTime".into(),
                    message: "must be >= startTime".into(),
                });
            }
        }
        Ok(())
    }
}
