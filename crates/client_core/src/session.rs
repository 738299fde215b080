//! Pairing lifecycle state machine.
//!
//! Handlers re-derive validity from the current state on every call, so
//! duplicate or reordered channel events leave the session consistent.
//!
//! Re-entry policy:
//! - `start_pairing` outside Idle is a no-op. Leaving comes first.
//! - `start-chat` while Pairing begins a session. While Paired with the same
//!   peer (peer still present) it is a duplicate and ignored. While Paired
//!   with another peer, or after the peer left, the server's pairing wins:
//!   the log is cleared and the new peer adopted. In Idle it is stale.
//! - `other-user-left` and `receive-message` only apply while Paired.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{ParticipantId, SessionPhase},
    error::ApiException,
    protocol::{ChatMessage, ClientRequest, ServerEvent},
};
use tracing::{debug, info, warn};

use crate::{
    channel::{ChannelAdapter, ChannelSubscription},
    conversation::{ConversationLog, DisplayEntry},
    relative_time::RelativeTimeLabels,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Pairing,
    Paired {
        peer: ParticipantId,
        peer_left: bool,
    },
}

/// What an operation changed. The renderer redraws (and scrolls to the
/// newest entry) on anything but `Unchanged`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Unchanged,
    PairingStarted,
    Paired { peer: ParticipantId },
    PeerLeft,
    MessageAppended,
    Unpaired,
}

impl SessionUpdate {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

pub struct SessionController {
    channel: Arc<dyn ChannelAdapter>,
    state: SessionState,
    log: ConversationLog,
    subscription: Option<ChannelSubscription>,
}

impl SessionController {
    pub fn new(channel: Arc<dyn ChannelAdapter>) -> Self {
        Self {
            log: ConversationLog::new(Arc::clone(&channel)),
            channel,
            state: SessionState::Idle,
            subscription: None,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        self.channel.local_id()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        match &self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Pairing => SessionPhase::Pairing,
            SessionState::Paired {
                peer_left: false, ..
            } => SessionPhase::Paired,
            SessionState::Paired {
                peer_left: true, ..
            } => SessionPhase::Ended,
        }
    }

    pub fn peer(&self) -> Option<&ParticipantId> {
        match &self.state {
            SessionState::Paired { peer, .. } => Some(peer),
            _ => None,
        }
    }

    pub fn peer_left(&self) -> bool {
        matches!(
            self.state,
            SessionState::Paired {
                peer_left: true,
                ..
            }
        )
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn project_for_display(
        &self,
        now: DateTime<Utc>,
        labels: RelativeTimeLabels,
    ) -> impl Iterator<Item = DisplayEntry<'_>> + Clone + '_ {
        self.log.project_for_display(self.peer(), now, labels)
    }

    pub fn start_pairing(&mut self) -> SessionUpdate {
        if self.state != SessionState::Idle {
            debug!(phase = ?self.phase(), "session: start pairing ignored outside idle");
            return SessionUpdate::Unchanged;
        }

        // Subscribe before emitting so the match event cannot slip past.
        self.subscription = Some(self.channel.subscribe());
        self.channel.emit(ClientRequest::StartPairing);
        self.state = SessionState::Pairing;
        info!("session: waiting for a partner");
        SessionUpdate::PairingStarted
    }

    pub fn unpair(&mut self) -> SessionUpdate {
        if self.state == SessionState::Idle {
            return SessionUpdate::Unchanged;
        }

        self.channel.emit(ClientRequest::Unpair);
        self.state = SessionState::Idle;
        self.log.reset();
        self.subscription = None;
        info!("session: left");
        SessionUpdate::Unpaired
    }

    /// User-side send. Only accepted while paired with a present peer.
    pub fn send_message(&mut self, text: &str) -> SessionUpdate {
        self.send_message_at(text, Utc::now())
    }

    pub fn send_message_at(&mut self, text: &str, timestamp: DateTime<Utc>) -> SessionUpdate {
        if self.phase() != SessionPhase::Paired {
            debug!(phase = ?self.phase(), "session: send ignored without an active peer");
            return SessionUpdate::Unchanged;
        }
        match self.log.append_local_at(text, timestamp) {
            Some(_) => SessionUpdate::MessageAppended,
            None => SessionUpdate::Unchanged,
        }
    }

    pub fn on_paired(&mut self, peer_id: ParticipantId) -> SessionUpdate {
        match &self.state {
            SessionState::Idle => {
                debug!(peer = %peer_id, "session: stale start-chat while idle");
                return SessionUpdate::Unchanged;
            }
            SessionState::Paired {
                peer,
                peer_left: false,
            } if *peer == peer_id => {
                debug!(peer = %peer_id, "session: duplicate start-chat");
                return SessionUpdate::Unchanged;
            }
            SessionState::Paired { peer, .. } => {
                warn!(previous = %peer, peer = %peer_id, "session: re-paired by server");
            }
            SessionState::Pairing => {}
        }

        self.log.reset();
        self.state = SessionState::Paired {
            peer: peer_id.clone(),
            peer_left: false,
        };
        info!(peer = %peer_id, "session: paired");
        SessionUpdate::Paired { peer: peer_id }
    }

    pub fn on_peer_left(&mut self) -> SessionUpdate {
        if let SessionState::Paired { peer, peer_left } = &mut self.state {
            if !*peer_left {
                *peer_left = true;
                info!(peer = %peer, "session: peer left");
                return SessionUpdate::PeerLeft;
            }
        }
        debug!(phase = ?self.phase(), "session: other-user-left ignored");
        SessionUpdate::Unchanged
    }

    pub fn on_message(&mut self, message: ChatMessage) -> SessionUpdate {
        if self.phase() != SessionPhase::Paired {
            debug!(
                sender = %message.sender,
                phase = ?self.phase(),
                "session: message outside active pairing dropped"
            );
            return SessionUpdate::Unchanged;
        }
        let peer = self.peer().cloned();
        if self.log.append_remote(message, peer.as_ref()) {
            SessionUpdate::MessageAppended
        } else {
            SessionUpdate::Unchanged
        }
    }

    pub fn handle_event(&mut self, event: ServerEvent) -> SessionUpdate {
        match event {
            ServerEvent::StartChat(peer_id) => self.on_paired(peer_id),
            ServerEvent::OtherUserLeft => self.on_peer_left(),
            ServerEvent::ReceiveMessage(message) => self.on_message(message),
            ServerEvent::Connected { connection_id } => {
                debug!(connection_id = %connection_id, "session: connection announced");
                SessionUpdate::Unchanged
            }
            ServerEvent::Error(error) => {
                let err = ApiException::from(error);
                warn!(error = %err, phase = ?self.phase(), "session: server rejected intent");
                SessionUpdate::Unchanged
            }
        }
    }

    /// Applies every event already buffered on the active subscription.
    pub fn drain_pending(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Some(event) = self.subscription.as_mut().and_then(ChannelSubscription::try_recv) {
            updates.push(self.handle_event(event));
        }
        updates
    }

    /// Waits for the next channel event and applies it. Never resolves while
    /// no subscription is held (Idle), or after the channel has closed.
    pub async fn next_update(&mut self) -> SessionUpdate {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };
        match subscription.recv().await {
            Some(event) => self.handle_event(event),
            None => {
                warn!("session: channel closed");
                self.subscription = None;
                std::future::pending().await
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
