//! The one active data channel: send gating and inbound dispatch.

use crate::error::SendError;
use crate::peer::types::{ChannelState, InboundMessage};
use crate::peer::{ChannelLink, ChannelObserver};
use crate::session::SessionId;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Receives every inbound text message
pub type DataHandler = Arc<dyn Fn(String) + Send + Sync>;

/// Replaceable receive handler shared by every session of a controller
#[derive(Clone)]
pub struct HandlerSlot(Arc<RwLock<DataHandler>>);

impl Default for HandlerSlot {
    fn default() -> Self {
        Self(Arc::new(RwLock::new(default_handler())))
    }
}

impl HandlerSlot {
    pub fn replace(&self, handler: DataHandler) {
        *self.0.write() = handler;
    }

    /// Invoke the current handler. The lock is released before the call so a
    /// handler may replace itself.
    pub fn dispatch(&self, data: String) {
        let handler = self.0.read().clone();
        handler(data);
    }
}

fn default_handler() -> DataHandler {
    Arc::new(|data: String| info!("Received: {}", data))
}

/// What a channel reports back to its owner
pub(crate) trait ChannelEvents: Send + Sync {
    fn is_current(&self, session: SessionId) -> bool;
    fn opened(&self, session: SessionId, label: &str);
    fn closed(&self, session: SessionId);
}

/// Wraps the data channel of a session
pub struct ChannelIo {
    label: String,
    link: Arc<dyn ChannelLink>,
    state: Arc<Mutex<ChannelState>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl ChannelIo {
    /// Wire the observers and start the writer. Host-created and remote-announced
    /// channels both come through here. Must run inside a tokio runtime.
    pub(crate) fn attach(
        session: SessionId,
        link: Arc<dyn ChannelLink>,
        handler: HandlerSlot,
        events: Weak<dyn ChannelEvents>,
    ) -> Self {
        let label = link.label();
        let state = Arc::new(Mutex::new(link.ready_state()));

        let (outbound, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(link.clone(), label.clone(), rx));

        link.observe(Arc::new(ChannelWatch {
            session,
            label: label.clone(),
            state: state.clone(),
            handler,
            events,
        }));

        Self {
            label,
            link,
            state,
            outbound,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Queue a message. Refused unless the channel is open; nothing is transmitted then.
    pub fn send(&self, payload: String) -> Result<(), SendError> {
        let state = self.state();
        if state != ChannelState::Open {
            return Err(SendError::NotOpen(state));
        }
        self.outbound
            .send(payload)
            .map_err(|_| SendError::NotOpen(ChannelState::Closed))
    }

    pub(crate) async fn close(self) {
        *self.state.lock() = ChannelState::Closed;
        if let Err(e) = self.link.close().await {
            error!("Failed to close data channel '{}': {:#}", self.label, e);
        }
    }
}

/// Sends queued messages one at a time so they leave in order
async fn write_loop(
    link: Arc<dyn ChannelLink>,
    label: String,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    while let Some(text) = rx.recv().await {
        let len = text.len();
        match link.send_text(text).await {
            Ok(()) => debug!("Sent {} bytes on '{}'", len, label),
            Err(e) => error!("Failed to send on data channel '{}': {:#}", label, e),
        }
    }
}

struct ChannelWatch {
    session: SessionId,
    label: String,
    state: Arc<Mutex<ChannelState>>,
    handler: HandlerSlot,
    events: Weak<dyn ChannelEvents>,
}

impl ChannelObserver for ChannelWatch {
    fn on_open(&self) {
        info!("Data channel open");
        *self.state.lock() = ChannelState::Open;
        if let Some(events) = self.events.upgrade() {
            events.opened(self.session, &self.label);
        }
    }

    fn on_message(&self, msg: InboundMessage) {
        let current = self
            .events
            .upgrade()
            .is_some_and(|events| events.is_current(self.session));
        if !current {
            debug!("Dropping message from superseded session {}", self.session);
            return;
        }
        self.handler.dispatch(msg.into_text());
    }

    fn on_close(&self) {
        *self.state.lock() = ChannelState::Closed;
        if let Some(events) = self.events.upgrade() {
            events.closed(self.session);
        }
    }
}
