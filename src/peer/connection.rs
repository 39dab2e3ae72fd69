use crate::config::LinkConfig;
use crate::peer::data_channel::WebRtcChannel;
use crate::peer::types::{SdpKind, SessionDescription};
use crate::peer::{ChannelLink, GatheringHandler, PeerConnector, PeerLink, RemoteChannelHandler};
use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace};
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::{
    api::APIBuilder,
    data_channel::{data_channel_init::RTCDataChannelInit, RTCDataChannel},
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{
        configuration::RTCConfiguration, peer_connection_state::RTCPeerConnectionState,
        RTCPeerConnection,
    },
};

/// Builds webrtc-rs peer connections
#[derive(Debug, Default, Clone, Copy)]
pub struct WebRtcConnector;

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(&self, config: &LinkConfig) -> Result<Arc<dyn PeerLink>> {
        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(config.include_loopback);

        let api = APIBuilder::new().with_setting_engine(settings).build();
        let pc = Arc::new(api.new_peer_connection(rtc_config(config)).await?);
        debug!(
            servers = config.ice_servers.len(),
            loopback = config.include_loopback,
            "Peer connection created"
        );
        Ok(Arc::new(WebRtcLink::new(pc)))
    }
}

/// Configuration for the peer connection. No servers means host candidates only.
fn rtc_config(config: &LinkConfig) -> RTCConfiguration {
    let ice_servers = if config.ice_servers.is_empty() {
        Vec::new()
    } else {
        vec![RTCIceServer {
            urls: config.ice_servers.clone(),
            ..Default::default()
        }]
    };

    RTCConfiguration {
        ice_servers,
        ..Default::default()
    }
}

#[derive(Default)]
struct Gathering {
    complete: bool,
    handler: Option<GatheringHandler>,
}

/// webrtc-rs peer connection behind the provider seam
pub struct WebRtcLink {
    pc: Arc<RTCPeerConnection>,
    gathering: Arc<Mutex<Gathering>>,
}

impl WebRtcLink {
    fn new(pc: Arc<RTCPeerConnection>) -> Self {
        let gathering = Arc::new(Mutex::new(Gathering::default()));

        let slot = gathering.clone();
        pc.on_ice_candidate(Box::new(move |cand: Option<RTCIceCandidate>| {
            match cand {
                Some(c) => {
                    if let Ok(init) = c.to_json() {
                        trace!(candidate = %init.candidate, "Local candidate");
                    }
                }
                None => {
                    // cand == None marks the end of gathering
                    debug!("ICE candidate gathering completed");
                    let handler = {
                        let mut state = slot.lock();
                        state.complete = true;
                        state.handler.take()
                    };
                    if let Some(handler) = handler {
                        handler();
                    }
                }
            }
            Box::pin(async {})
        }));

        pc.on_peer_connection_state_change(Box::new(move |st: RTCPeerConnectionState| {
            info!("Peer connection state changed to: {:?}", st);
            Box::pin(async {})
        }));

        Self { pc, gathering }
    }
}

#[async_trait]
impl PeerLink for WebRtcLink {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.pc.create_offer(None).await?;
        from_rtc(&offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.pc.create_answer(None).await?;
        from_rtc(&answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.pc.set_local_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.pc.set_remote_description(to_rtc(desc)?).await?;
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let desc = self.pc.local_description().await?;
        from_rtc(&desc).ok()
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        let desc = self.pc.remote_description().await?;
        from_rtc(&desc).ok()
    }

    fn on_gathering_complete(&self, handler: GatheringHandler) {
        let mut state = self.gathering.lock();
        if state.complete {
            drop(state);
            handler();
        } else {
            state.handler = Some(handler);
        }
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChannelLink>> {
        let dc = self
            .pc
            .create_data_channel(label, Some(RTCDataChannelInit::default()))
            .await?;
        Ok(Arc::new(WebRtcChannel::new(dc)))
    }

    fn on_data_channel(&self, handler: RemoteChannelHandler) {
        self.pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            info!("Received data channel '{}'", dc.label());
            handler(Arc::new(WebRtcChannel::new(dc)));
            Box::pin(async {})
        }));
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
    };
    Ok(rtc)
}

fn from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        other => bail!("unsupported session description type: {}", other),
    };
    Ok(SessionDescription {
        kind,
        sdp: desc.sdp.clone(),
    })
}
