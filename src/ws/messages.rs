//! WebSocket message types: envelope, commands, and event selectors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::EventId;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp.
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server-originated message stamped with the current time.
    #[must_use]
    pub fn server(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Builds an error reply.
    #[must_use]
    pub fn error(id: String, code: u16, message: &str) -> Self {
        Self::server(
            id,
            WsMessageType::Error,
            serde_json::json!({ "code": code, "message": message }),
        )
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// One entry of `event_ids`: an id (number or numeric string) or `"*"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EventSelector {
    /// A single event.
    Id(EventId),
    /// An id sent as a string, or the wildcard.
    #[serde(deserialize_with = "selector_from_str")]
    Text(Option<EventId>),
}

fn selector_from_str<'de, D>(deserializer: D) -> Result<Option<EventId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw == "*" {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(|id| Some(EventId::new(id)))
        .map_err(serde::de::Error::custom)
}

impl EventSelector {
    /// The selected event, or `None` for the wildcard.
    #[must_use]
    pub const fn event_id(self) -> Option<EventId> {
        match self {
            Self::Id(id) => Some(id),
            Self::Text(id) => id,
        }
    }
}

/// Commands that a client can send over WebSocket, read from the
/// envelope's `payload`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Subscribe to the live feed of specific events. Use `["*"]` for all.
    Subscribe {
        /// Events to watch.
        event_ids: Vec<EventSelector>,
    },
    /// Stop watching specific events. `"*"` clears the wildcard.
    Unsubscribe {
        /// Events to drop.
        event_ids: Vec<EventSelector>,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_accepts_numbers_strings_and_wildcard() {
        let payload = serde_json::json!({
            "command": "subscribe",
            "event_ids": [4, "7", "*"]
        });
        let Ok(WsCommand::Subscribe { event_ids }) = serde_json::from_value(payload) else {
            panic!("subscribe should parse");
        };
        let selected: Vec<Option<EventId>> =
            event_ids.iter().map(|s| s.event_id()).collect();
        assert_eq!(
            selected,
            vec![Some(EventId::new(4)), Some(EventId::new(7)), None]
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        let payload = serde_json::json!({ "command": "check_in", "event_ids": [] });
        assert!(serde_json::from_value::<WsCommand>(payload).is_err());
    }

    #[test]
    fn non_numeric_string_is_rejected() {
        let payload = serde_json::json!({ "command": "subscribe", "event_ids": ["abc"] });
        assert!(serde_json::from_value::<WsCommand>(payload).is_err());
    }

    #[test]
    fn envelope_uses_type_field() {
        let msg = WsMessage::error("req-1".to_string(), 400, "bad");
        let Ok(json) = serde_json::to_value(&msg) else {
            panic!("serialization failed");
        };
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["code"], 400);
    }
}
