use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoreDataType {
    Numeric,
    Boolean,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoreSource {
    Api,
    Sdk,
    Ui,
    Workflow,
    Eval,
    Annotation,
}

/// The type-constrained score value: NUMERIC requires a finite number,
/// BOOLEAN a boolean, CATEGORICAL a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Numeric(f64),
    Boolean(bool),
    Categorical(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBody {
    pub id: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation_id: Option<String>,
    pub name: String,
    pub value: ScoreValue,
    pub data_type: ScoreDataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub source: ScoreSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ScoreBody {
    pub fn numeric(
        id: impl Into<String>,
        trace_id: impl Into<String>,
        name: impl Into<String>,
        value: f64,
        source: ScoreSource,
    ) -> Self {
        Self::new(id, trace_id, name, ScoreValue::Numeric(value), ScoreDataType::Numeric, source)
    }

    pub fn boolean(
        id: impl Into<String>,
        trace_id: impl Into<String>,
        name: impl Into<String>,
        value: bool,
        source: ScoreSource,
    ) -> Self {
        Self::new(id, trace_id, name, ScoreValue::Boolean(value), ScoreDataType::Boolean, source)
    }

    pub fn categorical(
        id: impl Into<String>,
        trace_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
        source: ScoreSource,
    ) -> Self {
        Self::new(
            id,
            trace_id,
            name,
            ScoreValue::Categorical(value.into()),
            ScoreDataType::Categorical,
            source,
        )
    }

    fn new(
        id: impl Into<String>,
        trace_id: impl Into<String>,
        name: impl Into<String>,
        value: ScoreValue,
        data_type: ScoreDataType,
        source: ScoreSource,
    ) -> Self {
        Self {
            id: id.into(),
            trace_id: trace_id.into(),
            observation_id: None,
            name: name.into(),
            value,
            data_type,
            comment: None,
            config_id: None,
            timestamp: Some(Utc::now()),
            source,
            author_user_id: None,
            queue_id: None,
            metadata: None,
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
        if self.timestamp.is_none() {
            return Err(ValidationError {
                field: "body.timestamp".into(),
                message: "is required".into(),
            });
        }
        match (&self.data_type, &self.value) {
            (ScoreDataType::Numeric, ScoreValue::Numeric(v)) if v.is_finite() => Ok(()),
            (ScoreDataType::Numeric, _) => Err(ValidationError {
                field: "body.value".into(),
                message: "NUMERIC dataType requires a finite numeric value".into(),
            }),
            (ScoreDataType::Boolean, ScoreValue::Boolean(_)) => Ok(()),
            (ScoreDataType::Boolean, _) => Err(ValidationError {
                field: "body.value".into(),
                message: "BOOLEAN dataType requires a boolean value".into(),
            }),
            (ScoreDataType::Categorical, ScoreValue::Categorical(_)) => Ok(()),
            (ScoreDataType::Categorical, _) => Err(ValidationError {
                field: "body.value".into(),
                message: "CATEGORICAL dataType requires a string value".into(),
            }),
        }?;
        Ok(())
    }
}
