use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server_url must start with http://, https://, ws:// or wss://: {0}")]
    InvalidServerUrl(String),
    #[error("failed to connect websocket {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("server did not identify this connection within {0:?}")]
    HandshakeTimeout(std::time::Duration),
    #[error("channel closed")]
    Closed,
    #[error("invalid frame: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
