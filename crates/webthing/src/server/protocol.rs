//! WebSocket Protocol Messages
//!
//! Inbound messages are the three client message types of the Web Thing
//! protocol; everything a client receives is a serialized [`Envelope`].

use serde_json::{Map, Value};

use thing_types::{Envelope, MessageType};

use super::error::status_line;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `{"messageType": "setProperty", "data": {"<name>": <value>, ...}}`
    SetProperty(Map<String, Value>),

    /// `{"messageType": "requestAction", "data": {"<name>": {"input": {...}}}}`
    RequestAction(Value),

    /// `{"messageType": "addEventSubscription", "data": {"<name>": {}, ...}}`
    AddEventSubscription(Map<String, Value>),
}

/// Why an inbound message was rejected before dispatch
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Parsing request failed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown messageType: {0}")]
    Unsupported(MessageType),

    #[error("Invalid message: data must be an object")]
    InvalidData,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        if !envelope.message_type.is_inbound() {
            return Err(ProtocolError::Unsupported(envelope.message_type));
        }
        let Value::Object(data) = envelope.data else {
            return Err(ProtocolError::InvalidData);
        };

        Ok(match envelope.message_type {
            MessageType::SetProperty => ClientMessage::SetProperty(data),
            MessageType::AddEventSubscription => ClientMessage::AddEventSubscription(data),
            _ => ClientMessage::RequestAction(Value::Object(data)),
        })
    }
}

/// Serialized `error` message for one thing
pub fn error_message(thing_id: &str, code: u16, message: impl Into<String>) -> String {
    let envelope = Envelope::error(&status_line(code), message).for_thing(thing_id);
    serde_json::to_string(&envelope).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        let msg = ClientMessage::parse(r#"{"messageType":"setProperty","data":{"on":true}}"#).unwrap();
        assert_eq!(msg, ClientMessage::SetProperty(json!({"on": true}).as_object().unwrap().clone()));

        let msg = ClientMessage::parse(
            r#"{"messageType":"requestAction","data":{"fade":{"input":{"level":5}}}}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::RequestAction(_)));
    }

    #[test]
    fn test_reject_bad_messages() {
        assert!(matches!(
            ClientMessage::parse("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"messageType":"propertyStatus","data":{}}"#),
            Err(ProtocolError::Unsupported(MessageType::PropertyStatus))
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"messageType":"setProperty","data":5}"#),
            Err(ProtocolError::InvalidData)
        ));
    }

    #[test]
    fn test_error_message_shape() {
        let text = error_message("lamp-1", 400, "Invalid property value");
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            json!({
                "messageType": "error",
                "id": "lamp-1",
                "data": {"status": "400 Bad Request", "message": "Invalid property value"}
            })
        );
    }
}
