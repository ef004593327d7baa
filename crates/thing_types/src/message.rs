//! WebSocket Message Envelope
//!
//! Every message on a thing's WebSocket, in both directions, is
//! `{"messageType": ..., "data": {...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Kind of a WebSocket message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    ActionStatus,
    AddEventSubscription,
    Error,
    Event,
    PropertyStatus,
    RequestAction,
    SetProperty,
}

impl MessageType {
    /// Whether clients may send this message type
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            MessageType::AddEventSubscription | MessageType::RequestAction | MessageType::SetProperty
        )
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageType::ActionStatus => "actionStatus",
            MessageType::AddEventSubscription => "addEventSubscription",
            MessageType::Error => "error",
            MessageType::Event => "event",
            MessageType::PropertyStatus => "propertyStatus",
            MessageType::RequestAction => "requestAction",
            MessageType::SetProperty => "setProperty",
        };
        write!(f, "{}", name)
    }
}

/// A message envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub message_type: MessageType,
    /// Id of the thing the message is about (set on outbound messages)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub data: JsonValue,
}

impl Envelope {
    pub fn new(message_type: MessageType, data: JsonValue) -> Self {
        Self {
            message_type,
            id: None,
            data,
        }
    }

    /// Tag the message with the thing it concerns
    pub fn for_thing(mut self, thing_id: impl Into<String>) -> Self {
        self.id = Some(thing_id.into());
        self
    }

    /// `propertyStatus` with a single changed property
    pub fn property_status(name: &str, value: JsonValue) -> Self {
        Self::new(MessageType::PropertyStatus, json!({ name: value }))
    }

    /// `actionStatus` carrying an action's rendered description
    pub fn action_status(name: &str, description: JsonValue) -> Self {
        Self::new(MessageType::ActionStatus, json!({ name: description }))
    }

    /// `event` carrying one event record
    pub fn event(name: &str, data: JsonValue, timestamp: &str) -> Self {
        Self::new(
            MessageType::Event,
            json!({ name: { "data": data, "timestamp": timestamp } }),
        )
    }

    /// `error` with an HTTP-style status line
    pub fn error(status: &str, message: impl Into<String>) -> Self {
        Self::new(
            MessageType::Error,
            json!({ "status": status, "message": message.into() }),
        )
    }

    /// The single key of an object payload, e.g. the event name of an `event`
    pub fn single_key(&self) -> Option<&str> {
        let map = self.data.as_object()?;
        if map.len() != 1 {
            return None;
        }
        map.keys().next().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_format() {
        let msg = Envelope::property_status("on", json!(true)).for_thing("lamp-1");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"messageType": "propertyStatus", "id": "lamp-1", "data": {"on": true}})
        );
    }

    #[test]
    fn test_parse_inbound() {
        let msg: Envelope = serde_json::from_str(
            r#"{"messageType":"requestAction","data":{"fade":{"input":{"level":10}}}}"#,
        )
        .unwrap();
        assert_eq!(msg.message_type, MessageType::RequestAction);
        assert!(msg.message_type.is_inbound());
        assert_eq!(msg.single_key(), Some("fade"));
    }

    #[test]
    fn test_event_shape() {
        let msg = Envelope::event("overheated", json!(102), "2024-01-01T00:00:00Z");
        assert_eq!(msg.single_key(), Some("overheated"));
        assert_eq!(msg.data["overheated"]["data"], json!(102));
        assert_eq!(MessageType::Event.to_string(), "event");
    }
}
