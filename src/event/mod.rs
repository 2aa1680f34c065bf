//! The event/envelope data model and JSON wire codec.
//!
//! Every event enqueued into the pipeline is a tagged variant over the eleven
//! kinds Langfuse's ingestion endpoint understands. Constructors accept the
//! minimal required fields; everything else defaults to `None`. `Validate`
//! checks structural invariants only — the dynamic payload fields
//! (`input`/`output`/`metadata`/score `value`) are opaque JSON and are never
//! inspected beyond their outer shape.

mod batch;
mod envelope;
mod observation;
mod score;
mod trace;

pub use batch::{BatchMetadata, BatchRequest, BatchResponse, IngestionError, UsageStats};
pub use envelope::Envelope;
pub use observation::{ObservationBody, ObservationKind};
pub use score::{ScoreBody, ScoreDataType, ScoreSource, ScoreValue};
pub use trace::TraceBody;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of envelopes in a single batch request.
pub const MAX_BATCH_SIZE: usize = 100;

/// A validation failure: the first structural rule an event or batch violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl From<ValidationError> for crate::error::Error {
    fn from(e: ValidationError) -> Self {
        crate::error::Error::Validation(e.to_string())
    }
}

/// The eleven event kinds the ingestion endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    TraceCreate,
    TraceUpdate,
    ObservationCreate,
    ObservationUpdate,
    SpanCreate,
    SpanUpdate,
    GenerationCreate,
    GenerationUpdate,
    EventCreate,
    ScoreCreate,
    SdkLog,
}

impl EventType {
    /// The kind of body this event type carries, for envelope/body agreement checks.
    pub(crate) fn body_kind(self) -> &'static str {
        match self {
            EventType::TraceCreate | EventType::TraceUpdate => "trace",
            EventType::ObservationCreate
            | EventType::ObservationUpdate
            | EventType::SpanCreate
            | EventType::SpanUpdate
            | EventType::GenerationCreate
            | EventType::GenerationUpdate
            | EventType::EventCreate => "observation",
            EventType::ScoreCreate => "score",
            EventType::SdkLog => "sdk_log",
        }
    }
}

/// The variant payload carried by an [`Event`].
///
/// Serializes untagged (just the inner object, no variant wrapper), since the
/// envelope's own `type` field is what distinguishes the variants on the
/// wire. Deserializing untagged by field-shape inference would be wrong here:
/// `TraceBody`, `ObservationBody`, and `ScoreBody` all have non-optional `id`
/// and `name`-shaped fields, so a shape-guessing decoder would happily parse
/// every body as `Trace`. Decoding therefore dispatches on the envelope's
/// `type` field explicitly — see [`body_from_value`] and `Event`/`Envelope`'s
/// `Deserialize` impls — rather than deriving `Deserialize` on this enum.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventBody {
    Trace(TraceBody),
    Observation(ObservationBody),
    Score(ScoreBody),
    SdkLog(Value),
}

impl EventBody {
    fn kind(&self) -> &'static str {
        match self {
            EventBody::Trace(_) => "trace",
            EventBody::Observation(_) => "observation",
            EventBody::Score(_) => "score",
            EventBody::SdkLog(_) => "sdk_log",
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EventBody::Trace(t) => t.validate(),
            EventBody::Observation(o) => o.validate(),
            EventBody::Score(s) => s.validate(),
            EventBody::SdkLog(_) => Ok(()),
        }
    }
}

/// Decode a raw JSON `body` value into the `EventBody` variant named by
/// `event_type`, instead of guessing from field shape.
pub(crate) fn body_from_value<E>(event_type: EventType, value: Value) -> Result<EventBody, E>
where
    E: serde::de::Error,
{
    match event_type.body_kind() {
        "trace" => serde_json::from_value(value)
            .map(EventBody::Trace)
            .map_err(E::custom),
        "observation" => serde_json::from_value(value)
            .map(EventBody::Observation)
            .map_err(E::custom),
        "score" => serde_json::from_value(value)
            .map(EventBody::Score)
            .map_err(E::custom),
        _ => Ok(EventBody::SdkLog(value)),
    }
}

/// The raw wire shape shared by [`Event`] and [`Envelope`]: `body` is decoded
/// as plain JSON first, then redispatched by `type` in each type's own
/// `Deserialize` impl.
#[derive(Deserialize)]
struct RawEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: EventType,
    timestamp: DateTime<Utc>,
    body: Value,
}

/// A single unit of telemetry, owned by the pipeline from `enqueue` until
/// submission succeeds or it is dropped.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub body: EventBody,
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEnvelope::deserialize(deserializer)?;
        let body = body_from_value(raw.event_type, raw.body)?;
        Ok(Event {
            id: raw.id,
            event_type: raw.event_type,
            timestamp: raw.timestamp,
            body,
        })
    }
}

impl Event {
    /// Check every structural invariant from the wire-format contract.
    /// Returns the first violation found; dynamic payload fields are never
    /// inspected beyond type-level shape (they are caller-supplied JSON).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError {
                field: "id".into(),
                message: "must not be empty".into(),
            });
        }
        if self.timestamp.timestamp_nanos_opt().unwrap_or(0) == 0 {
            return Err(ValidationError {
                field: "timestamp".into(),
                message: "must be non-zero".into(),
            });
        }
        if self.event_type.body_kind() != self.body.kind() {
            return Err(ValidationError {
                field: "type".into(),
                message: format!(
                    "envelope type {:?} does not match body kind {}",
                    self.event_type,
                    self.body.kind()
                ),
            });
        }
        self.body.validate()
    }

    pub fn trace_create(trace: TraceBody) -> Self {
        Self::new(EventType::TraceCreate, EventBody::Trace(trace))
    }

    pub fn trace_update(trace: TraceBody) -> Self {
        Self::new(EventType::TraceUpdate, EventBody::Trace(trace))
    }

    pub fn span_create(obs: ObservationBody) -> Self {
        Self::new(EventType::SpanCreate, EventBody::Observation(obs))
    }

    pub fn span_update(obs: ObservationBody) -> Self {
        Self::new(EventType::SpanUpdate, EventBody::Observation(obs))
    }

    pub fn generation_create(obs: ObservationBody) -> Self {
        Self::new(EventType::GenerationCreate, EventBody::Observation(obs))
    }

    pub fn generation_update(obs: ObservationBody) -> Self {
        Self::new(EventType::GenerationUpdate, EventBody::Observation(obs))
    }

    pub fn event_create(obs: ObservationBody) -> Self {
        Self::new(EventType::EventCreate, EventBody::Observation(obs))
    }

    pub fn score_create(score: ScoreBody) -> Self {
        Self::new(EventType::ScoreCreate, EventBody::Score(score))
    }

    pub fn sdk_log(payload: Value) -> Self {
        Self::new(EventType::SdkLog, EventBody::SdkLog(payload))
    }

    fn new(event_type: EventType, body: EventBody) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            timestamp: Utc::now(),
            body,
        }
    }
}

/// Helper constructor for the `metadata: string -> any` map used throughout
/// the body types.
pub fn metadata(pairs: impl IntoIterator<Item = (String, Value)>) -> Map<String, Value> {
    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_preserves_nanosecond_timestamps_and_optional_fields() {
        let mut trace = TraceBody::new("trace-1", "my-app");
        trace.user_id = Some("user-123".into());
        let event = Event::trace_create(trace);

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.id, event.id);
        assert_eq!(
            decoded.timestamp.timestamp_nanos_opt(),
            event.timestamp.timestamp_nanos_opt()
        );
        match (&decoded.body, &event.body) {
            (EventBody::Trace(a), EventBody::Trace(b)) => {
                assert_eq!(a.user_id, b.user_id);
                assert_eq!(a.session_id, b.session_id);
            }
            _ => panic!("expected trace bodies"),
        }
    }

    #[test]
    fn json_round_trip_decodes_observation_body_correctly() {
        let mut obs = ObservationBody::new("obs-1", "trace-1", ObservationKind::Generation, "call-llm");
        obs.model = Some("gpt-4".into());
        let event = Event::generation_create(obs);

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();

        match decoded.body {
            EventBody::Observation(o) => {
                assert_eq!(o.id, "obs-1");
                assert_eq!(o.trace_id, "trace-1");
                assert_eq!(o.kind, ObservationKind::Generation);
                assert_eq!(o.model, Some("gpt-4".into()));
            }
            other => panic!("expected an observation body, got {other:?}"),
        }
        decoded.validate().unwrap();
    }

    #[test]
    fn json_round_trip_decodes_score_body_correctly() {
        let score = ScoreBody::numeric("score-1", "trace-1", "accuracy", 0.75, ScoreSource::Api);
        let event = Event::score_create(score);

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();

        match decoded.body {
            EventBody::Score(s) => {
                assert_eq!(s.id, "score-1");
                match s.value {
                    ScoreValue::Numeric(v) => assert!((v - 0.75).abs() < f64::EPSILON),
                    other => panic!("expected a numeric score value, got {other:?}"),
                }
            }
            other => panic!("expected a score body, got {other:?}"),
        }
        decoded.validate().unwrap();
    }

    #[test]
    fn json_round_trip_decodes_sdk_log_body_as_opaque_json() {
        let payload = serde_json::json!({"level": "info", "message": "hello"});
        let event = Event::sdk_log(payload.clone());

        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: Event = serde_json::from_str(&encoded).unwrap();

        match decoded.body {
            EventBody::SdkLog(v) => assert_eq!(v, payload),
            other => panic!("expected an sdk log body, got {other:?}"),
        }
    }

    #[test]
    fn envelope_decode_dispatches_on_type_not_body_shape() {
        let obs = ObservationBody::new("obs-2", "trace-2", ObservationKind::Span, "fetch-docs");
        let event = Event::span_create(obs);
        let envelope = Envelope::from(&event);

        let encoded = serde_json::to_string(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_str(&encoded).unwrap();

        assert!(matches!(decoded.body, EventBody::Observation(_)));
        decoded.validate().unwrap();
    }

    #[test]
    fn validate_rejects_type_body_mismatch() {
        let mut event = Event::trace_create(TraceBody::new("t1", "t"));
        event.event_type = EventType::ScoreCreate;
        let err = event.validate().unwrap_err();
        assert_eq!(err.field, "type");
    }

    #[test]
    fn validate_rejects_empty_id() {
        let mut event = Event::trace_create(TraceBody::new("t1", "t"));
        event.id.clear();
        let err = event.validate().unwrap_err();
        assert_eq!(err.field, "id");
    }

    #[test]
    fn score_validate_enforces_value_data_type_agreement() {
        let score = ScoreBody::numeric("s1", "t1", "accuracy", 0.9, ScoreSource::Api);
        assert!(score.validate().is_ok());

        let mut mismatched = score.clone();
        mismatched.data_type = ScoreDataType::Boolean;
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn batch_request_enforces_size_bounds() {
        assert!(BatchRequest::new(vec![]).is_err());

        let envelopes: Vec<Envelope> = (0..MAX_BATCH_SIZE)
            .map(|i| Envelope::from(Event::trace_create(TraceBody::new(format!("t{i}"), "t"))))
            .collect();
        assert!(BatchRequest::new(envelopes).is_ok());

        let too_many: Vec<Envelope> = (0..=MAX_BATCH_SIZE)
            .map(|i| Envelope::from(Event::trace_create(TraceBody::new(format!("t{i}"), "t"))))
            .collect();
        assert!(matches!(
            BatchRequest::new(too_many),
            Err(crate::error::Error::BatchSizeExceeded { .. })
        ));
    }
}
