//! Scripted in-process provider. Every callback fires synchronously on the
//! caller's task, which is the harshest ordering the controller has to survive.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use lanpair::peer::{GatheringHandler, RemoteChannelHandler};
use lanpair::{
    ChannelLink, ChannelObserver, ChannelState, InboundMessage, LinkConfig, PeerConnector,
    PeerLink, SessionDescription,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// When a link reports the end of candidate gathering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gather {
    /// As soon as the local description is applied
    Immediate,
    /// Never; the controller has to time out or be cancelled
    Never,
}

#[derive(Debug, Clone, Copy)]
struct Behavior {
    gather: Gather,
    fail_offer: bool,
}

pub struct FakeConnector {
    behavior: Mutex<Behavior>,
    links: Mutex<Vec<Arc<FakeLink>>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(Behavior {
                gather: Gather::Immediate,
                fail_offer: false,
            }),
            links: Mutex::new(Vec::new()),
        })
    }

    /// Applies to links created from now on
    pub fn set_gather(&self, gather: Gather) {
        self.behavior.lock().gather = gather;
    }

    pub fn set_fail_offer(&self, fail: bool) {
        self.behavior.lock().fail_offer = fail;
    }

    pub fn links(&self) -> Vec<Arc<FakeLink>> {
        self.links.lock().clone()
    }

    pub fn link(&self, index: usize) -> Arc<FakeLink> {
        self.links.lock()[index].clone()
    }

    pub fn last_link(&self) -> Arc<FakeLink> {
        self.links
            .lock()
            .last()
            .cloned()
            .expect("no link was created")
    }
}

#[async_trait]
impl PeerConnector for FakeConnector {
    async fn connect(&self, _config: &LinkConfig) -> Result<Arc<dyn PeerLink>> {
        let behavior = *self.behavior.lock();
        let mut links = self.links.lock();
        let link = Arc::new(FakeLink::new(links.len() + 1, behavior));
        links.push(link.clone());
        Ok(link)
    }
}

pub struct FakeLink {
    index: usize,
    behavior: Behavior,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    gathered: AtomicBool,
    gathering_handler: Mutex<Option<GatheringHandler>>,
    remote_channel_handler: Mutex<Option<Arc<dyn Fn(Arc<dyn ChannelLink>) + Send + Sync>>>,
    channels: Mutex<Vec<Arc<FakeChannel>>>,
    closed: AtomicBool,
}

impl FakeLink {
    fn new(index: usize, behavior: Behavior) -> Self {
        Self {
            index,
            behavior,
            local: Mutex::new(None),
            remote: Mutex::new(None),
            gathered: AtomicBool::new(false),
            gathering_handler: Mutex::new(None),
            remote_channel_handler: Mutex::new(None),
            channels: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn channel(&self, index: usize) -> Arc<FakeChannel> {
        self.channels.lock()[index].clone()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    /// Report the end of gathering by hand
    pub fn finish_gathering(&self) {
        self.gathered.store(true, Ordering::SeqCst);
        let handler = self.gathering_handler.lock().take();
        if let Some(handler) = handler {
            handler();
        }
    }

    /// Simulate the remote peer opening a data channel
    pub fn announce_channel(&self, label: &str) -> Arc<FakeChannel> {
        let channel = FakeChannel::new(label);
        self.channels.lock().push(channel.clone());
        let handler = self.remote_channel_handler.lock().clone();
        if let Some(handler) = handler {
            handler(channel.clone());
        }
        channel
    }
}

#[async_trait]
impl PeerLink for FakeLink {
    async fn create_offer(&self) -> Result<SessionDescription> {
        if self.behavior.fail_offer {
            bail!("offer rejected by fake provider");
        }
        Ok(SessionDescription::offer(fake_sdp("offer", self.index)))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        if self.remote.lock().is_none() {
            bail!("cannot answer without a remote offer");
        }
        Ok(SessionDescription::answer(fake_sdp("answer", self.index)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        *self.local.lock() = Some(desc);
        if self.behavior.gather == Gather::Immediate {
            self.finish_gathering();
        }
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        if !desc.sdp.starts_with("v=0") {
            bail!("remote description is not an SDP body");
        }
        *self.remote.lock() = Some(desc);
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        self.local.lock().clone()
    }

    async fn remote_description(&self) -> Option<SessionDescription> {
        self.remote.lock().clone()
    }

    fn on_gathering_complete(&self, handler: GatheringHandler) {
        if self.gathered.load(Ordering::SeqCst) {
            handler();
        } else {
            *self.gathering_handler.lock() = Some(handler);
        }
    }

    async fn create_data_channel(&self, label: &str) -> Result<Arc<dyn ChannelLink>> {
        let channel = FakeChannel::new(label);
        self.channels.lock().push(channel.clone());
        Ok(channel)
    }

    fn on_data_channel(&self, handler: RemoteChannelHandler) {
        *self.remote_channel_handler.lock() = Some(Arc::from(handler));
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeChannel {
    label: String,
    state: Mutex<ChannelState>,
    observer: Mutex<Option<Arc<dyn ChannelObserver>>>,
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl FakeChannel {
    fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            state: Mutex::new(ChannelState::Connecting),
            observer: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn observer(&self) -> Option<Arc<dyn ChannelObserver>> {
        self.observer.lock().clone()
    }

    /// Transport is up
    pub fn open(&self) {
        *self.state.lock() = ChannelState::Open;
        if let Some(observer) = self.observer() {
            observer.on_open();
        }
    }

    /// A text frame from the remote peer
    pub fn deliver(&self, text: &str) {
        if let Some(observer) = self.observer() {
            observer.on_message(InboundMessage {
                data: Bytes::from(text.to_string()),
                is_string: true,
            });
        }
    }

    /// The remote peer went away
    pub fn remote_close(&self) {
        *self.state.lock() = ChannelState::Closed;
        if let Some(observer) = self.observer() {
            observer.on_close();
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelLink for FakeChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn ready_state(&self) -> ChannelState {
        *self.state.lock()
    }

    fn observe(&self, observer: Arc<dyn ChannelObserver>) {
        *self.observer.lock() = Some(observer.clone());
        if self.ready_state() == ChannelState::Open {
            observer.on_open();
        }
    }

    async fn send_text(&self, text: String) -> Result<()> {
        if self.ready_state() != ChannelState::Open {
            bail!("channel '{}' is not open", self.label);
        }
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        *self.state.lock() = ChannelState::Closed;
        Ok(())
    }
}

/// Minimal SDP body with one host candidate and a per-link DTLS fingerprint
pub fn fake_sdp(kind: &str, index: usize) -> String {
    format!(
        "v=0\r\n\
         o=- {index} 2 IN IP4 127.0.0.1\r\n\
         s=fake-{kind}\r\n\
         t=0 0\r\n\
         m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n\
         a=fingerprint:sha-256 AB:CD:EF:{index:02X}\r\n\
         a=candidate:1 1 udp 2130706431 192.168.1.{index} 50000 typ host\r\n\
         a=end-of-candidates\r\n"
    )
}

/// Poll `check` until it holds or about a second has passed
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
