use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of control messages exchanged with the lobby coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "join")]
    Join,
    #[serde(rename = "leave")]
    Leave,
    #[serde(rename = "startGame")]
    StartGame,
    #[serde(rename = "notification")]
    Notification,
    #[serde(rename = "gameStarted")]
    GameStarted,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::Join,
        MessageType::Leave,
        MessageType::StartGame,
        MessageType::Notification,
        MessageType::GameStarted,
    ];

    /// Wire literal for this message type
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Join => "join",
            MessageType::Leave => "leave",
            MessageType::StartGame => "startGame",
            MessageType::Notification => "notification",
            MessageType::GameStarted => "gameStarted",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque token identifying the connecting client. Never generated or validated here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

/// Opaque token identifying a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(String);

macro_rules! opaque_id {
    ($name:ident) => {
        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

opaque_id!(SessionId);
opaque_id!(LobbyId);

/// A self-describing protocol message.
///
/// Both identities travel with every message, including broadcasts where one
/// of them carries no meaning for the receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub session_id: SessionId,
    pub lobby_id: LobbyId,
    #[serde(default)]
    pub data: Value,
}

impl Message {
    pub fn new(
        kind: MessageType,
        session_id: impl Into<SessionId>,
        lobby_id: impl Into<LobbyId>,
        data: Value,
    ) -> Self {
        Self {
            kind,
            session_id: session_id.into(),
            lobby_id: lobby_id.into(),
            data,
        }
    }

    pub fn join(session_id: impl Into<SessionId>, lobby_id: impl Into<LobbyId>) -> Self {
        Self::new(MessageType::Join, session_id, lobby_id, Value::Null)
    }

    pub fn leave(session_id: impl Into<SessionId>, lobby_id: impl Into<LobbyId>) -> Self {
        Self::new(MessageType::Leave, session_id, lobby_id, Value::Null)
    }

    pub fn start_game(
        session_id: impl Into<SessionId>,
        lobby_id: impl Into<LobbyId>,
        data: Value,
    ) -> Self {
        Self::new(MessageType::StartGame, session_id, lobby_id, data)
    }
}

/// Encode a message as a UTF-8 JSON text frame
pub fn encode(message: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Decode an inbound frame. Frames that are not UTF-8 JSON matching the schema are rejected.
pub fn decode(frame: &[u8]) -> Result<Message, serde_json::Error> {
    serde_json::from_slice(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_wire_format() {
        let frame = encode(&Message::join("sess-1", "lobby-42")).unwrap();
        assert_eq!(
            frame,
            r#"{"type":"join","sessionId":"sess-1","lobbyId":"lobby-42","data":null}"#
        );
    }

    #[test]
    fn test_decode_game_started() {
        let frame = br#"{"type":"gameStarted","sessionId":"sess-1","lobbyId":"lobby-42","data":{"mapId":3}}"#;
        let message = decode(frame).unwrap();

        assert_eq!(message.kind, MessageType::GameStarted);
        assert_eq!(message.session_id.as_str(), "sess-1");
        assert_eq!(message.lobby_id.as_str(), "lobby-42");
        assert_eq!(message.data, json!({"mapId": 3}));
    }

    #[test]
    fn test_type_literals_match_wire() {
        for kind in MessageType::ALL {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, Value::String(kind.as_str().to_string()));
        }
    }

    #[test]
    fn test_every_type_survives_encoding() {
        let payloads = [
            Value::Null,
            json!("text"),
            json!(-12.5),
            json!([1, "two", null, {"three": true}]),
            json!({"nested": {"players": ["a", "b"], "ready": false}}),
        ];

        for kind in MessageType::ALL {
            for data in &payloads {
                let original = Message::new(kind, "sess", "lobby", data.clone());
                let decoded = decode(encode(&original).unwrap().as_bytes()).unwrap();
                assert_eq!(decoded, original);
            }
        }
    }

    #[test]
    fn test_missing_data_decodes_as_null() {
        let message = decode(br#"{"type":"leave","sessionId":"s","lobbyId":"l"}"#).unwrap();
        assert_eq!(message.data, Value::Null);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let message =
            decode(br#"{"type":"notification","sessionId":"s","lobbyId":"l","data":1,"ts":9}"#)
                .unwrap();
        assert_eq!(message.kind, MessageType::Notification);
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(decode(br#"{"type":"kick","sessionId":"s","lobbyId":"l","data":null}"#).is_err());
    }

    #[test]
    fn test_rejects_missing_identity() {
        assert!(decode(br#"{"type":"join","sessionId":"s","data":null}"#).is_err());
    }

    #[test]
    fn test_rejects_non_utf8() {
        assert!(decode(&[0xff, 0xfe, 0x00]).is_err());
    }
}
