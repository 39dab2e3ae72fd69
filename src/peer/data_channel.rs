use crate::peer::types::{ChannelState, InboundMessage};
use crate::peer::{ChannelLink, ChannelObserver};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;

/// webrtc-rs data channel behind the provider seam
pub struct WebRtcChannel {
    dc: Arc<RTCDataChannel>,
}

impl WebRtcChannel {
    pub fn new(dc: Arc<RTCDataChannel>) -> Self {
        Self { dc }
    }
}

fn channel_state(state: RTCDataChannelState) -> ChannelState {
    match state {
        RTCDataChannelState::Open => ChannelState::Open,
        RTCDataChannelState::Closing | RTCDataChannelState::Closed => ChannelState::Closed,
        _ => ChannelState::Connecting,
    }
}

#[async_trait]
impl ChannelLink for WebRtcChannel {
    fn label(&self) -> String {
        self.dc.label().to_string()
    }

    fn ready_state(&self) -> ChannelState {
        channel_state(self.dc.ready_state())
    }

    fn observe(&self, observer: Arc<dyn ChannelObserver>) {
        let label = self.label();

        let on_open = observer.clone();
        let open_label = label.clone();
        self.dc.on_open(Box::new(move || {
            debug!("Data channel '{}' open", open_label);
            on_open.on_open();
            Box::pin(async {})
        }));

        let on_message = observer.clone();
        self.dc.on_message(Box::new(move |msg: DataChannelMessage| {
            on_message.on_message(InboundMessage {
                data: msg.data,
                is_string: msg.is_string,
            });
            Box::pin(async {})
        }));

        let close_label = label.clone();
        self.dc.on_close(Box::new(move || {
            debug!("Data channel '{}' closed", close_label);
            observer.on_close();
            Box::pin(async {})
        }));

        self.dc.on_error(Box::new(move |err| {
            warn!("Data channel '{}' error: {}", label, err);
            Box::pin(async {})
        }));
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.dc.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.dc.close().await?;
        Ok(())
    }
}
