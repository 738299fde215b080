//! Ordered message history of the active pairing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ParticipantId, Side},
    protocol::{ChatMessage, ClientRequest},
};
use tracing::debug;

use crate::{channel::ChannelAdapter, relative_time::RelativeTimeLabels};

/// View record handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry<'a> {
    pub text: &'a str,
    pub time_label: String,
    pub side: Side,
}

pub struct ConversationLog {
    channel: Arc<dyn ChannelAdapter>,
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn new(channel: Arc<dyn ChannelAdapter>) -> Self {
        Self {
            channel,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append_local(&mut self, text: &str) -> Option<&ChatMessage> {
        self.append_local_at(text, Utc::now())
    }

    /// Whitespace-only input is dropped without building or emitting
    /// anything. Otherwise the trimmed text is appended and relayed.
    pub fn append_local_at(&mut self, text: &str, timestamp: DateTime<Utc>) -> Option<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            debug!("conversation: ignoring empty outgoing message");
            return None;
        }

        let message = ChatMessage::new(self.channel.local_id().clone(), text, timestamp);
        self.channel.emit(ClientRequest::SendMessage(message.clone()));
        self.messages.push(message);
        self.messages.last()
    }

    /// Accepts `message` only when it comes from `current_peer`.
    pub fn append_remote(
        &mut self,
        message: ChatMessage,
        current_peer: Option<&ParticipantId>,
    ) -> bool {
        if current_peer != Some(&message.sender) {
            debug!(
                sender = %message.sender,
                peer = ?current_peer.map(ParticipantId::as_str),
                "conversation: dropping message from stale sender"
            );
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    /// Lazily maps every message to a [`DisplayEntry`]. The iterator is
    /// `Clone`, so a clone restarts from the first message.
    pub fn project_for_display<'a>(
        &'a self,
        peer: Option<&'a ParticipantId>,
        now: DateTime<Utc>,
        labels: RelativeTimeLabels,
    ) -> impl Iterator<Item = DisplayEntry<'a>> + Clone + 'a {
        self.messages.iter().map(move |message| DisplayEntry {
            text: &message.text,
            time_label: labels.format(now - message.timestamp),
            side: if peer == Some(&message.sender) {
                Side::Peer
            } else {
                Side::Local
            },
        })
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;
