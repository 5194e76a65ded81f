//! Wire message schema: one JSON envelope shape for every message
//! type, carrying a type tag, a gossip-dedup id, and the originating
//! node's descriptive config.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::Block;
use crate::types::Entry;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SenderConfig {
    pub id: String,
    pub label: String,
    pub ip: String,
    pub url: String,
    #[serde(rename = "p2pPort")]
    pub p2p_port: u16,
    #[serde(rename = "webServicePort")]
    pub web_service_port: u16,
}

/// The envelope every message shares, before the payload is interpreted
/// according to `type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(rename = "senderConfig")]
    pub sender_config: SenderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("unrecognized message type: {0}")]
    UnknownType(String),
    #[error("message of type {0} is missing its data payload")]
    MissingData(&'static str),
    #[error("message payload does not match its declared type: {0}")]
    MalformedData(#[from] serde_json::Error),
}

/// The interpreted payload of a message, once `type` has been dispatched on.
#[derive(Clone, Debug)]
pub enum Message {
    Handshake,
    NewEntry(Entry),
    NewBlock(Block),
    RequestFullChain,
    FullChain(Vec<Block>),
}

impl Message {
    fn type_tag(&self) -> &'static str {
        match self {
            Message::Handshake => "handshake",
            Message::NewEntry(_) => "newEntry",
            Message::NewBlock(_) => "newBlock",
            Message::RequestFullChain => "requestFullChain",
            Message::FullChain(_) => "fullChain",
        }
    }

    fn data(&self) -> Option<serde_json::Value> {
        match self {
            Message::Handshake | Message::RequestFullChain => None,
            Message::NewEntry(entry) => Some(serde_json::to_value(entry).expect("Entry always serializes")),
            Message::NewBlock(block) => Some(serde_json::to_value(block).expect("Block always serializes")),
            Message::FullChain(chain) => Some(serde_json::to_value(chain).expect("chain always serializes")),
        }
    }

    /// Wraps this message in an envelope tagged with a fresh
    /// `messageId` and the sending node's descriptive config.
    pub fn into_envelope(self, sender_config: SenderConfig) -> Envelope {
        Envelope {
            kind: self.type_tag().to_string(),
            message_id: Uuid::new_v4().to_string(),
            sender_config,
            data: self.data(),
        }
    }
}

impl TryFrom<Envelope> for Message {
    type Error = MessageError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        match envelope.kind.as_str() {
            "handshake" => Ok(Message::Handshake),
            "requestFullChain" => Ok(Message::RequestFullChain),
            "newEntry" => {
                let data = envelope.data.ok_or(MessageError::MissingData("newEntry"))?;
                Ok(Message::NewEntry(serde_json::from_value(data)?))
            }
            "newBlock" => {
                let data = envelope.data.ok_or(MessageError::MissingData("newBlock"))?;
                Ok(Message::NewBlock(serde_json::from_value(data)?))
            }
            "fullChain" => {
                let data = envelope.data.ok_or(MessageError::MissingData("fullChain"))?;
                Ok(Message::FullChain(serde_json::from_value(data)?))
            }
            other => Err(MessageError::UnknownType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender_config() -> SenderConfig {
        SenderConfig {
            id: "node-a".into(),
            label: "Node A".into(),
            ip: "127.0.0.1".into(),
            url: "ws://127.0.0.1:9000".into(),
            p2p_port: 9000,
            web_service_port: 8080,
        }
    }

    #[test]
    fn handshake_round_trips_with_no_data() {
        let envelope = Message::Handshake.into_envelope(sender_config());
        let json = serde_json::to_string(&envelope).unwrap();
        let decoded: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.kind, "handshake");
        let message = Message::try_from(decoded).unwrap();
        assert!(matches!(message, Message::Handshake));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let envelope = Envelope {
            kind: "carrierPigeon".into(),
            message_id: "1".into(),
            sender_config: sender_config(),
            data: None,
        };
        assert!(matches!(Message::try_from(envelope), Err(MessageError::UnknownType(_))));
    }
}
