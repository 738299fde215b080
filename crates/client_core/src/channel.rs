//! Channel adapter seam between the session core and whatever transport
//! carries intents to the matchmaking server.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use shared::{
    domain::ParticipantId,
    protocol::{ClientRequest, ServerEvent},
};
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};

const EVENT_BUFFER: usize = 256;

/// Process-wide channel to the server. The session core never owns it
/// exclusively; it only emits intents and holds scoped subscriptions.
pub trait ChannelAdapter: Send + Sync {
    /// Identifier the server assigned to this connection.
    fn local_id(&self) -> &ParticipantId;

    /// Fire-and-forget. Delivery failures are not reported to the caller.
    fn emit(&self, request: ClientRequest);

    fn subscribe(&self) -> ChannelSubscription;
}

/// Listener registration on a channel. Dropping it unregisters the listener
/// and discards anything still buffered for it.
pub struct ChannelSubscription {
    id: u64,
    events: broadcast::Receiver<ServerEvent>,
}

impl ChannelSubscription {
    pub fn new(id: u64, events: broadcast::Receiver<ServerEvent>) -> Self {
        debug!(subscription = id, "acquired channel subscription");
        Self { id, events }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next event. `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(subscription = self.id, skipped, "channel subscription lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        loop {
            match self.events.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(subscription = self.id, skipped, "channel subscription lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        debug!(subscription = self.id, "released channel subscription");
    }
}

/// Fan-out half shared by the in-memory and WebSocket channels.
pub(crate) struct EventHub {
    sender: broadcast::Sender<ServerEvent>,
    next_id: AtomicU64,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            sender,
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe(&self) -> ChannelSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        ChannelSubscription::new(id, self.sender.subscribe())
    }

    /// Returns how many listeners saw the event.
    pub(crate) fn publish(&self, event: ServerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// In-process channel: records every emitted intent and lets the caller
/// inject server events. Used by tests and offline demos.
pub struct MemoryChannel {
    local_id: ParticipantId,
    sent: Mutex<Vec<ClientRequest>>,
    hub: EventHub,
}

impl MemoryChannel {
    pub fn new(local_id: impl Into<ParticipantId>) -> Self {
        Self {
            local_id: local_id.into(),
            sent: Mutex::new(Vec::new()),
            hub: EventHub::new(),
        }
    }

    pub fn deliver(&self, event: ServerEvent) -> usize {
        self.hub.publish(event)
    }

    pub fn sent_requests(&self) -> Vec<ClientRequest> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn take_sent_requests(&self) -> Vec<ClientRequest> {
        std::mem::take(
            &mut *self
                .sent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    pub fn listener_count(&self) -> usize {
        self.hub.listener_count()
    }
}

impl ChannelAdapter for MemoryChannel {
    fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    fn emit(&self, request: ClientRequest) {
        debug!(request = request.name(), "memory channel: recorded intent");
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }

    fn subscribe(&self) -> ChannelSubscription {
        self.hub.subscribe()
    }
}

/// Stand-in for a channel that never came up. Intents vanish and no events
/// ever arrive.
pub struct DisconnectedChannel {
    local_id: ParticipantId,
    hub: EventHub,
}

impl DisconnectedChannel {
    pub fn new(local_id: impl Into<ParticipantId>) -> Self {
        Self {
            local_id: local_id.into(),
            hub: EventHub::new(),
        }
    }
}

impl ChannelAdapter for DisconnectedChannel {
    fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    fn emit(&self, request: ClientRequest) {
        warn!(
            request = request.name(),
            "channel unavailable; intent not delivered"
        );
    }

    fn subscribe(&self) -> ChannelSubscription {
        self.hub.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
