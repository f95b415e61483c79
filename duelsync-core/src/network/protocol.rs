// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Protocol Layer
//!
//! JSON envelope encoding: `{ "type": string, "data": object }` in both
//! directions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::NetworkError;
use super::message::{InboundMessage, OutboundMessage};

/// Maximum frame size (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1_048_576;

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: &'a Value,
}

#[derive(Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: String,
    data: Map<String, Value>,
}

/// Serializes an outbound message into a text frame.
pub fn encode_message(message: &OutboundMessage) -> Result<String, NetworkError> {
    check_data(&message.payload)?;
    let envelope = OutboundEnvelope {
        kind: message.kind.as_str(),
        data: &message.payload,
    };
    let json =
        serde_json::to_string(&envelope).map_err(|e| NetworkError::Serialization(e.to_string()))?;

    if json.len() > MAX_MESSAGE_SIZE {
        return Err(NetworkError::InvalidMessage(format!(
            "Message too large: {} bytes (max {})",
            json.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    Ok(json)
}

/// Parses a text frame into an inbound message.
pub fn decode_message(frame: &str, received_at: u64) -> Result<InboundMessage, NetworkError> {
    if frame.len() > MAX_MESSAGE_SIZE {
        return Err(NetworkError::InvalidMessage(format!(
            "Message too large: {} bytes (max {})",
            frame.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    let envelope: InboundEnvelope =
        serde_json::from_str(frame).map_err(|e| NetworkError::InvalidMessage(e.to_string()))?;

    if envelope.kind.trim().is_empty() {
        return Err(NetworkError::InvalidMessage("Empty message type".into()));
    }

    Ok(InboundMessage {
        kind: envelope.kind,
        data: Value::Object(envelope.data),
        received_at,
    })
}

/// Checks that `data` fits the envelope's `data` slot.
pub fn check_data(data: &Value) -> Result<(), NetworkError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(NetworkError::InvalidMessage(format!(
            "Message data must be a JSON object, got {}",
            json_type_name(data)
        )))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::message::MessageKind;
    use serde_json::json;

    #[test]
    fn test_encode_produces_type_and_data() {
        let msg = OutboundMessage::new(
            MessageKind::SubmitProof,
            json!({"game_id": "g1", "round_id": "r1", "payload": "qed"}),
            0,
        );

        let frame = encode_message(&msg).unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();

        assert_eq!(value["type"], "submit_proof");
        assert_eq!(value["data"]["payload"], "qed");
        // The local id never goes on the wire
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_decode_keeps_object_data() {
        let msg = decode_message(r#"{"type":"pong","data":{"seq":4}}"#, 9).unwrap();
        assert_eq!(msg.kind, "pong");
        assert_eq!(msg.data, json!({"seq": 4}));
        assert_eq!(msg.received_at, 9);
    }

    #[test]
    fn test_decode_rejects_non_object_data() {
        for frame in [
            r#"{"type":"x","data":5}"#,
            r#"{"type":"x","data":"text"}"#,
            r#"{"type":"x","data":[1,2]}"#,
            r#"{"type":"x","data":null}"#,
            r#"{"type":"x"}"#,
        ] {
            let result = decode_message(frame, 0);
            assert!(
                matches!(result, Err(NetworkError::InvalidMessage(_))),
                "accepted {}",
                frame
            );
        }
    }

    #[test]
    fn test_encode_rejects_non_object_data() {
        let msg = OutboundMessage::new(MessageKind::Test, json!(5), 0);
        let err = encode_message(&msg).unwrap_err();
        assert!(err.to_string().contains("got number"));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let result = decode_message("not valid json", 0);
        assert!(matches!(result, Err(NetworkError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        let result = decode_message(r#"{"data":{}}"#, 0);
        assert!(matches!(result, Err(NetworkError::InvalidMessage(_))));

        let result = decode_message(r#"{"type":"  ","data":{}}"#, 0);
        assert!(matches!(result, Err(NetworkError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_rejects_oversized_frame() {
        let oversized = "x".repeat(MAX_MESSAGE_SIZE + 1);
        let result = decode_message(&oversized, 0);
        assert!(result.unwrap_err().to_string().contains("too large"));
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let msg = OutboundMessage::new(
            MessageKind::Test,
            json!({ "blob": "x".repeat(MAX_MESSAGE_SIZE) }),
            0,
        );
        assert!(matches!(
            encode_message(&msg),
            Err(NetworkError::InvalidMessage(_))
        ));
    }
}
