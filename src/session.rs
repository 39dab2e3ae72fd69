use crate::channel::ChannelIo;
use crate::peer::types::SessionDescription;
use crate::peer::PeerLink;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// Identifies one connection attempt within a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub(crate) u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Joiner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => write!(f, "host"),
            Role::Joiner => write!(f, "joiner"),
        }
    }
}

/// Where a session is in the handshake.
///
/// Host: `Gathering` -> `AwaitingAnswer` -> `Connecting` -> `Open`.
/// Joiner: `Gathering` -> `Connecting` -> `Open`.
/// Any establishment failure ends in `Failed`; teardown or a remote close in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Gathering,
    AwaitingAnswer,
    Connecting,
    Open,
    Failed,
    Closed,
}

impl Phase {
    /// Still working towards an open channel
    pub fn is_establishing(self) -> bool {
        matches!(
            self,
            Phase::Gathering | Phase::AwaitingAnswer | Phase::Connecting
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Failed | Phase::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Gathering => "gathering",
            Phase::AwaitingAnswer => "awaiting answer",
            Phase::Connecting => "connecting",
            Phase::Open => "open",
            Phase::Failed => "failed",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lifecycle notifications broadcast by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PhaseChanged { session: SessionId, phase: Phase },
    ChannelOpen { session: SessionId, label: String },
    ChannelClosed { session: SessionId },
}

/// Live state for one connection attempt. Owns its peer connection and data channel.
pub(crate) struct Session {
    pub id: SessionId,
    pub role: Role,
    pub phase: Phase,
    pub link: Arc<dyn PeerLink>,
    pub channel: Option<ChannelIo>,
    pub local: Option<SessionDescription>,
    /// Attempt id carried in the signals
    pub signal_id: String,
    cancel: watch::Sender<bool>,
}

impl Session {
    pub fn new(id: SessionId, role: Role, link: Arc<dyn PeerLink>, signal_id: String) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            id,
            role,
            phase: Phase::Gathering,
            link,
            channel: None,
            local: None,
            signal_id,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Stop the session and hand back what must be released
    pub fn retire(&mut self) -> Retired {
        self.cancel();
        self.phase = Phase::Closed;
        Retired {
            id: self.id,
            channel: self.channel.take(),
            link: self.link.clone(),
        }
    }
}

/// Resources of a session that has been closed or superseded
pub(crate) struct Retired {
    pub id: SessionId,
    channel: Option<ChannelIo>,
    link: Arc<dyn PeerLink>,
}

impl Retired {
    /// Close the channel first, then the peer connection
    pub async fn dispose(self) {
        if let Some(channel) = self.channel {
            channel.close().await;
        }
        if let Err(e) = self.link.close().await {
            warn!("Failed to close peer connection of session {}: {:#}", self.id, e);
        }
    }
}
