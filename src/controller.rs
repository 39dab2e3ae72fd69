//! Host and joiner handshakes over a single session.
//!
//! Host: `start_host` -> offer text, later `set_answer(answer text)`.
//! Joiner: `join_host(offer text)` -> answer text.
//! Both ends wait for candidate gathering to finish, so each side sends exactly one string.

use crate::channel::{ChannelEvents, ChannelIo, DataHandler, HandlerSlot};
use crate::config::LinkConfig;
use crate::error::{Error, Result, SendError};
use crate::peer::fingerprint;
use crate::peer::ice::analyze_candidates;
use crate::peer::types::{ChannelState, SdpKind, SdpPayload, SessionDescription};
use crate::peer::{ChannelLink, PeerConnector, PeerLink, WebRtcConnector};
use crate::session::{Phase, Role, Session, SessionEvent, SessionId};
use crate::signaling;
use crate::utils::{now_ts, random_id};
use anyhow::anyhow;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, error, info, warn};

const EVENT_CAPACITY: usize = 64;

/// State shared with provider callbacks
struct Shared {
    current: Mutex<Option<Session>>,
    handler: HandlerSlot,
    events: broadcast::Sender<SessionEvent>,
    next_id: AtomicU64,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Move the session to `phase` if it is still current and `allowed` accepts its phase
    fn transition(&self, id: SessionId, phase: Phase, allowed: impl Fn(Phase) -> bool) -> bool {
        let mut current = self.current.lock();
        match current.as_mut() {
            Some(session) if session.id == id && allowed(session.phase) => {
                debug!("Session {} {} -> {}", id, session.phase, phase);
                session.phase = phase;
                self.emit(SessionEvent::PhaseChanged { session: id, phase });
                true
            }
            _ => false,
        }
    }

    /// The single "channel acquired" transition for both roles
    fn acquire_channel(self: &Arc<Self>, id: SessionId, link: Arc<dyn ChannelLink>) {
        if !self.is_current(id) {
            debug!("Ignoring data channel '{}' for superseded session {}", link.label(), id);
            return;
        }

        info!("Data channel '{}' acquired by session {}", link.label(), id);
        let events: Weak<dyn ChannelEvents> = Arc::downgrade(self);
        let channel = ChannelIo::attach(id, link, self.handler.clone(), events);

        let mut current = self.current.lock();
        match current.as_mut() {
            Some(session) if session.id == id => session.channel = Some(channel),
            // superseded while wiring
            _ => {
                drop(current);
                tokio::spawn(channel.close());
            }
        }
    }
}

impl ChannelEvents for Shared {
    fn is_current(&self, session: SessionId) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|s| s.id == session && !s.phase.is_terminal())
    }

    fn opened(&self, session: SessionId, label: &str) {
        if self.transition(session, Phase::Open, Phase::is_establishing) {
            self.emit(SessionEvent::ChannelOpen {
                session,
                label: label.to_string(),
            });
        }
    }

    fn closed(&self, session: SessionId) {
        if self.transition(session, Phase::Closed, |phase| !phase.is_terminal()) {
            info!("Data channel of session {} closed", session);
            self.emit(SessionEvent::ChannelClosed { session });
        }
    }
}

/// Drives the offer/answer handshake and owns the active session
pub struct ConnectionController {
    connector: Arc<dyn PeerConnector>,
    config: LinkConfig,
    shared: Arc<Shared>,
}

impl ConnectionController {
    /// Controller backed by webrtc-rs
    pub fn new(config: LinkConfig) -> Self {
        Self::with_connector(Arc::new(WebRtcConnector), config)
    }

    pub fn with_connector(connector: Arc<dyn PeerConnector>, config: LinkConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connector,
            config,
            shared: Arc::new(Shared {
                current: Mutex::new(None),
                handler: HandlerSlot::default(),
                events,
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Host: open a data channel, gather candidates and return the offer text.
    /// Supersedes any previous session.
    pub async fn start_host(&self) -> Result<String> {
        info!("start_host called - creating new peer connection");
        let link = self.connector.connect(&self.config).await?;
        let (id, cancel) = self.install(Role::Host, link.clone(), random_id()).await;

        let work = async {
            let channel = link.create_data_channel(&self.config.channel_label).await?;
            self.shared.acquire_channel(id, channel);

            let offer = link.create_offer().await?;
            let gathered = gathering_signal(link.as_ref());
            link.set_local_description(offer).await?;
            self.finish_gathering(link.as_ref(), gathered).await
        };

        let local = guarded(cancel, work).await;
        self.settle(id, local, Phase::AwaitingAnswer)
    }

    /// Host: apply the joiner's answer text
    pub async fn set_answer(&self, answer: &str) -> Result<()> {
        info!("set_answer called, encoded length: {}", answer.len());
        let payload = signaling::decode_kind(answer, SdpKind::Answer)?;

        let (id, link, signal_id) = {
            let current = self.shared.current.lock();
            match current.as_ref() {
                Some(s) if s.role == Role::Host && s.phase == Phase::AwaitingAnswer => {
                    (s.id, s.link.clone(), s.signal_id.clone())
                }
                Some(s) => {
                    return Err(Error::Sequence {
                        operation: "set_answer",
                        phase: s.phase,
                    })
                }
                None => {
                    return Err(Error::Sequence {
                        operation: "set_answer",
                        phase: Phase::Idle,
                    })
                }
            }
        };

        if !payload.id.is_empty() && payload.id != signal_id {
            warn!(
                "Answer was created for attempt {}, current attempt is {}",
                payload.id, signal_id
            );
        }

        match link.set_remote_description(payload.sdp).await {
            Ok(()) => {
                info!("Remote description set successfully");
                self.shared
                    .transition(id, Phase::Connecting, |p| p == Phase::AwaitingAnswer);
                Ok(())
            }
            Err(e) => {
                error!("Failed to set remote description: {:#}", e);
                self.shared.transition(id, Phase::Failed, |p| !p.is_terminal());
                Err(Error::Provider(e))
            }
        }
    }

    /// Joiner: apply the host's offer text and return the answer text.
    /// A malformed offer fails before any session is touched.
    pub async fn join_host(&self, offer: &str) -> Result<String> {
        info!("join_host called, encoded length: {}", offer.len());
        let payload = signaling::decode_kind(offer, SdpKind::Offer)?;
        let signal_id = if payload.id.is_empty() {
            random_id()
        } else {
            payload.id.clone()
        };

        let link = self.connector.connect(&self.config).await?;
        let (id, cancel) = self.install(Role::Joiner, link.clone(), signal_id).await;

        let shared = Arc::downgrade(&self.shared);
        link.on_data_channel(Box::new(move |channel| {
            if let Some(shared) = shared.upgrade() {
                shared.acquire_channel(id, channel);
            }
        }));

        let work = async {
            link.set_remote_description(payload.sdp).await?;
            let answer = link.create_answer().await?;
            let gathered = gathering_signal(link.as_ref());
            link.set_local_description(answer).await?;
            self.finish_gathering(link.as_ref(), gathered).await
        };

        let local = guarded(cancel, work).await;
        self.settle(id, local, Phase::Connecting)
    }

    /// Send text over the open channel. Never panics; refusals are logged and returned.
    pub fn send(&self, payload: impl Into<String>) -> std::result::Result<(), SendError> {
        let result = {
            let current = self.shared.current.lock();
            match current.as_ref().and_then(|s| s.channel.as_ref()) {
                Some(channel) => channel.send(payload.into()),
                None => Err(SendError::NoChannel),
            }
        };
        if let Err(e) = &result {
            error!("Message not sent: {}", e);
        }
        result
    }

    /// Replace the receive handler. Applies to the current channel and every later one.
    pub fn on_data_received<F>(&self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let handler: DataHandler = Arc::new(handler);
        self.shared.handler.replace(handler);
    }

    /// Lifecycle events for this controller
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Abort an in-flight `start_host`/`join_host`
    pub fn cancel(&self) {
        if let Some(session) = self.shared.current.lock().as_ref() {
            info!("Cancelling session {}", session.id);
            session.cancel();
        }
    }

    /// Tear down the current session: data channel first, then the peer connection
    pub async fn close(&self) {
        let retired = {
            let mut current = self.shared.current.lock();
            match current.as_mut() {
                Some(session) if session.phase != Phase::Closed || session.channel.is_some() => {
                    Some(session.retire())
                }
                _ => None,
            }
        };

        if let Some(retired) = retired {
            let id = retired.id;
            info!("Closing session {}", id);
            retired.dispose().await;
            self.shared.emit(SessionEvent::PhaseChanged {
                session: id,
                phase: Phase::Closed,
            });
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared
            .current
            .lock()
            .as_ref()
            .map_or(Phase::Idle, |s| s.phase)
    }

    pub fn role(&self) -> Option<Role> {
        self.shared.current.lock().as_ref().map(|s| s.role)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.shared.current.lock().as_ref().map(|s| s.id)
    }

    pub fn channel_state(&self) -> Option<ChannelState> {
        self.shared
            .current
            .lock()
            .as_ref()
            .and_then(|s| s.channel.as_ref())
            .map(ChannelIo::state)
    }

    pub fn is_connected(&self) -> bool {
        self.channel_state() == Some(ChannelState::Open)
    }

    /// Finalized local description of the current session, once gathering is done
    pub fn local_description(&self) -> Option<SessionDescription> {
        self.shared
            .current
            .lock()
            .as_ref()
            .and_then(|s| s.local.clone())
    }

    /// Short code to compare with the other side; `None` until both descriptions are applied
    pub async fn verification_code(&self) -> Option<String> {
        let link = self.shared.current.lock().as_ref().map(|s| s.link.clone())?;
        let local = link.local_description().await?;
        let remote = link.remote_description().await?;
        fingerprint::verification_code(&local.sdp, &remote.sdp)
    }

    /// Make a new session current and release the one it replaces
    async fn install(
        &self,
        role: Role,
        link: Arc<dyn PeerLink>,
        signal_id: String,
    ) -> (SessionId, watch::Receiver<bool>) {
        let id = SessionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Session::new(id, role, link, signal_id);
        let cancel = session.cancel_token();

        let previous = self.shared.current.lock().replace(session).map(|mut old| old.retire());
        self.shared.emit(SessionEvent::PhaseChanged {
            session: id,
            phase: Phase::Gathering,
        });

        if let Some(previous) = previous {
            info!("Session {} supersedes session {}", id, previous.id);
            previous.dispose().await;
        }
        info!("Session {} started as {}", id, role);
        (id, cancel)
    }

    async fn finish_gathering(
        &self,
        link: &dyn PeerLink,
        gathered: oneshot::Receiver<()>,
    ) -> Result<SessionDescription> {
        debug!("Waiting for ICE candidate gathering to complete");
        match self.config.gathering_timeout {
            Some(limit) => match tokio::time::timeout(limit, gathered).await {
                Ok(done) => done.map_err(|_| gathering_dropped())?,
                Err(_) => return Err(Error::Timeout(limit)),
            },
            None => gathered.await.map_err(|_| gathering_dropped())?,
        }

        let local = link
            .local_description()
            .await
            .ok_or_else(|| Error::Provider(anyhow!("local description missing after gathering")))?;
        analyze_candidates(&local);
        Ok(local)
    }

    /// Record the outcome of an establishment and encode the local description
    fn settle(
        &self,
        id: SessionId,
        local: Result<SessionDescription>,
        next: Phase,
    ) -> Result<String> {
        let local = match local {
            Ok(local) => local,
            Err(e) => {
                warn!("Session {} failed: {}", id, e);
                self.shared.transition(id, Phase::Failed, |p| !p.is_terminal());
                return Err(e);
            }
        };

        let signal_id = {
            let mut current = self.shared.current.lock();
            match current.as_mut() {
                Some(session) if session.id == id && !session.phase.is_terminal() => {
                    session.local = Some(local.clone());
                    session.signal_id.clone()
                }
                _ => return Err(Error::Cancelled),
            }
        };

        let payload = SdpPayload {
            sdp: local,
            id: signal_id,
            ts: now_ts(),
        };
        let encoded = match signaling::encode(&payload, self.config.signal_format) {
            Ok(encoded) => encoded,
            Err(e) => {
                self.shared.transition(id, Phase::Failed, |p| !p.is_terminal());
                return Err(e.into());
            }
        };

        self.shared.transition(id, next, |p| p == Phase::Gathering);
        info!(
            "Session {} produced {}, encoded length: {}",
            id,
            payload.sdp.kind,
            encoded.len()
        );
        Ok(encoded)
    }
}

fn gathering_dropped() -> Error {
    Error::Provider(anyhow!(
        "peer connection dropped before candidate gathering completed"
    ))
}

/// Register for the "no more candidates" event. Call before applying the local
/// description so the event cannot be missed.
fn gathering_signal(link: &dyn PeerLink) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    link.on_gathering_complete(Box::new(move || {
        let _ = tx.send(());
    }));
    rx
}

/// Run `work` unless the session's cancel token fires first
async fn guarded<T>(
    mut cancel: watch::Receiver<bool>,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        result = work => result,
        _ = cancel.wait_for(|cancelled| *cancelled) => Err(Error::Cancelled),
    }
}
