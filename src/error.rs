use crate::peer::types::ChannelState;
use crate::session::Phase;
use crate::signaling::SignalError;
use std::time::Duration;

/// Failures while establishing a connection
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The counterpart's text could not be read as a description
    #[error("failed to decode signal: {0}")]
    Decode(#[from] SignalError),

    /// Operation called out of order
    #[error("{operation} is not allowed while the session is {phase}")]
    Sequence {
        operation: &'static str,
        phase: Phase,
    },

    /// The peer-connection provider failed; carries its error untouched
    #[error(transparent)]
    Provider(#[from] anyhow::Error),

    #[error("candidate gathering did not complete within {0:?}")]
    Timeout(Duration),

    #[error("connection attempt was cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a message was not sent. Reported, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("no data channel")]
    NoChannel,
    #[error("data channel is not open (state: {0})")]
    NotOpen(ChannelState),
}
