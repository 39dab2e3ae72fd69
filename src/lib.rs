//! Direct LAN pairing over a WebRTC data channel, with no signaling server.
//!
//! The host calls [`ConnectionController::start_host`] and hands the resulting
//! offer text to the joiner by any means (clipboard, QR code, chat). The joiner
//! feeds it to [`ConnectionController::join_host`] and returns the answer text,
//! which the host applies with [`ConnectionController::set_answer`]. From then on
//! both sides use `send` and `on_data_received`.

pub mod channel;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod utils;

pub use channel::{ChannelIo, DataHandler};
pub use config::{LinkConfig, SignalFormat};
pub use controller::ConnectionController;
pub use error::{Error, Result, SendError};
pub use peer::{
    ChannelLink, ChannelObserver, ChannelState, InboundMessage, PeerConnector, PeerLink, SdpKind,
    SdpPayload, SessionDescription, WebRtcConnector,
};
pub use session::{Phase, Role, SessionEvent, SessionId};
pub use signaling::SignalError;
