use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{body_from_value, Event, EventBody, EventType, RawEnvelope};

/// The outer object sent on the wire: `{id, type, timestamp, body}`.
///
/// `id` and `timestamp` mirror the inner event; `body` holds the full
/// variant record. Unknown fields are ignored on decode (`serde`'s default).
/// `body` is decoded by dispatching on the outer `type` field (see
/// `body_from_value`), not by untagged shape-guessing — see the comment on
/// [`EventBody`] for why that matters.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub body: EventBody,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawEnvelope::deserialize(deserializer)?;
        let body = body_from_value(raw.event_type, raw.body)?;
        Ok(Envelope {
            id: raw.id,
            event_type: raw.event_type,
            timestamp: raw.timestamp,
            body,
        })
    }
}

impl From<&Event> for Envelope {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            event_type: event.event_type,
            timestamp: event.timestamp,
            body: event.body.clone(),
        }
    }
}

impl From<Event> for Envelope {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            timestamp: event.timestamp,
            body: event.body,
        }
    }
}

impl Envelope {
    /// Re-run the same structural checks `Event::validate` performs; used
    /// after decode, where the envelope's outer `type` is authoritative and
    /// must agree with the inner body.
    pub fn validate(&self) -> Result<(), super::ValidationError> {
        Event {
            id: self.id.clone(),
            event_type: self.event_type,
            timestamp: self.timestamp,
            body: self.body.clone(),
        }
        .validate()
    }
}
