use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{domain::ParticipantId, error::ApiError};

/// One chat line as it travels over the channel. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: ParticipantId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: ParticipantId, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp,
        }
    }
}

/// Intents the client sends to the matchmaking server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientRequest {
    StartPairing,
    Unpair,
    SendMessage(ChatMessage),
}

impl ClientRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartPairing => "start-pairing",
            Self::Unpair => "unpair",
            Self::SendMessage(_) => "send-message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First event on a fresh connection.
    Connected { connection_id: ParticipantId },
    /// Payload is the bare peer id.
    StartChat(ParticipantId),
    OtherUserLeft,
    ReceiveMessage(ChatMessage),
    Error(ApiError),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::StartChat(_) => "start-chat",
            Self::OtherUserLeft => "other-user-left",
            Self::ReceiveMessage(_) => "receive-message",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
