//! Interaction event records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute map attached to an event.
pub type EventData = Map<String, Value>;

/// A single user interaction.
///
/// Field order matters: it is the serialized key order, and CSV export derives
/// its header from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Short category label such as `"tap"`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
    #[serde(
        rename = "sessionId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
}

impl InteractionEvent {
    /// Create an event stamped with the current wall-clock time.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: now_millis(),
            data: None,
            session_id: None,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Build the attribute map a tap binding attaches.
pub fn tap_data(name: &str) -> EventData {
    let mut data = EventData::new();
    data.insert("name".to_string(), Value::String(name.to_string()));
    data
}
