//! WebSocket implementation of [`ChannelAdapter`].

use std::{sync::Arc, time::Duration};

use futures::{SinkExt, Stream, StreamExt};
use shared::{
    domain::ParticipantId,
    protocol::{ClientRequest, ServerEvent},
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    channel::{ChannelAdapter, ChannelSubscription, EventHub},
    error::{ClientError, Result},
};

/// Maps an `http(s)://` or `ws(s)://` server address to its `/ws` endpoint.
pub fn websocket_url(server_url: &str) -> Result<Url> {
    let invalid = || ClientError::InvalidServerUrl(server_url.to_string());
    let mut url = Url::parse(server_url.trim()).map_err(|_| invalid())?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid()),
    };
    url.set_scheme(scheme).map_err(|()| invalid())?;
    let path = format!("{}/ws", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

pub struct WsChannel {
    local_id: ParticipantId,
    outbound: mpsc::UnboundedSender<ClientRequest>,
    hub: Arc<EventHub>,
}

impl WsChannel {
    /// Connects and waits for the server to announce this connection's id.
    pub async fn connect(server_url: &str, handshake_timeout: Duration) -> Result<Arc<Self>> {
        let ws_url = websocket_url(server_url)?;
        let (ws_stream, _) =
            connect_async(ws_url.as_str())
                .await
                .map_err(|err| ClientError::Connect {
                    url: ws_url.to_string(),
                    reason: err.to_string(),
                })?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let local_id = tokio::time::timeout(handshake_timeout, await_connected(&mut ws_reader))
            .await
            .map_err(|_| ClientError::HandshakeTimeout(handshake_timeout))??;
        info!(%ws_url, local_id = %local_id, "channel connected");

        let hub = Arc::new(EventHub::new());
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientRequest>();

        tokio::spawn(async move {
            while let Some(request) = outbound_rx.recv().await {
                let text = match encode_request(&request) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(request = request.name(), error = %err, "failed to encode intent");
                        continue;
                    }
                };
                if let Err(err) = ws_writer.send(Message::Text(text)).await {
                    warn!(error = %err, "websocket send failed; channel unavailable");
                    break;
                }
                debug!(request = request.name(), "sent intent");
            }
            let _ = ws_writer.close().await;
        });

        let reader_hub = Arc::clone(&hub);
        tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match decode_event(&text) {
                        Ok(event) => {
                            debug!(event = event.name(), "received server event");
                            reader_hub.publish(event);
                        }
                        Err(err) => warn!(error = %err, "invalid server event"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "websocket receive failed");
                        break;
                    }
                }
            }
            info!("channel reader stopped");
        });

        Ok(Arc::new(Self {
            local_id,
            outbound,
            hub,
        }))
    }
}

pub fn encode_request(request: &ClientRequest) -> Result<String> {
    Ok(serde_json::to_string(request)?)
}

pub fn decode_event(text: &str) -> Result<ServerEvent> {
    Ok(serde_json::from_str(text)?)
}

async fn await_connected<S>(reader: &mut S) -> Result<ParticipantId>
where
    S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg) = reader.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                return match decode_event(&text)? {
                    ServerEvent::Connected { connection_id } => Ok(connection_id),
                    other => Err(ClientError::Handshake(format!(
                        "expected connected event, got {}",
                        other.name()
                    ))),
                };
            }
            Ok(Message::Close(_)) => return Err(ClientError::Closed),
            Ok(_) => {}
            Err(err) => return Err(ClientError::Handshake(err.to_string())),
        }
    }
    Err(ClientError::Closed)
}

impl ChannelAdapter for WsChannel {
    fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    fn emit(&self, request: ClientRequest) {
        let name = request.name();
        if self.outbound.send(request).is_err() {
            warn!(request = name, "channel unavailable; intent not delivered");
        }
    }

    fn subscribe(&self) -> ChannelSubscription {
        self.hub.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
