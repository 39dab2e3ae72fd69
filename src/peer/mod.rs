//! Seam between the connection state machine and the peer-connection provider.
//!
//! `connection` and `data_channel` implement it over webrtc-rs. Anything else
//! that can create offers/answers, report the end of candidate gathering and
//! carry a text data channel can stand in.

pub mod connection;
pub mod data_channel;
pub mod fingerprint;
pub mod ice;
pub mod types;

use crate::config::LinkConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use connection::WebRtcConnector;
pub use types::{ChannelState, InboundMessage, SdpKind, SdpPayload, SessionDescription};

/// Called once, when the provider reports that no further candidates remain
pub type GatheringHandler = Box<dyn FnOnce() + Send>;

/// Called for every data channel opened by the remote peer
pub type RemoteChannelHandler = Box<dyn Fn(Arc<dyn ChannelLink>) + Send + Sync>;

/// Builds peer connections
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(&self, config: &LinkConfig) -> Result<Arc<dyn PeerLink>>;
}

/// One peer connection
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;
    async fn create_answer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<()>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    /// Current local description, including every candidate gathered so far
    async fn local_description(&self) -> Option<SessionDescription>;
    async fn remote_description(&self) -> Option<SessionDescription>;

    /// Fires immediately if gathering already finished
    fn on_gathering_complete(&self, handler: GatheringHandler);

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChannelLink>>;
    fn on_data_channel(&self, handler: RemoteChannelHandler);

    async fn close(&self) -> Result<()>;
}

/// Lifecycle events of a data channel
pub trait ChannelObserver: Send + Sync {
    fn on_open(&self);
    fn on_message(&self, msg: InboundMessage);
    fn on_close(&self);
}

/// One data channel
#[async_trait]
pub trait ChannelLink: Send + Sync {
    fn label(&self) -> String;
    fn ready_state(&self) -> ChannelState;

    /// Replaces any previous observer. `on_open` fires right away when the
    /// channel is already open.
    fn observe(&self, observer: Arc<dyn ChannelObserver>);

    async fn send_text(&self, text: String) -> Result<()>;
    async fn close(&self) -> Result<()>;
}
