//! Client core for random one-to-one chat pairing.
//!
//! [`SessionController`] drives the pairing lifecycle and owns the
//! [`ConversationLog`]; both talk to the server only through a
//! [`ChannelAdapter`].

pub mod channel;
pub mod conversation;
pub mod error;
pub mod relative_time;
pub mod session;
pub mod transport;

pub use channel::{ChannelAdapter, ChannelSubscription, DisconnectedChannel, MemoryChannel};
pub use conversation::{ConversationLog, DisplayEntry};
pub use error::ClientError;
pub use relative_time::{LabelLocale, RelativeTimeLabels};
pub use session::{SessionController, SessionState, SessionUpdate};
pub use transport::{decode_event, encode_request, websocket_url, WsChannel};
