use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of the exchange a description is
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdpKind::Offer => write!(f, "offer"),
            SdpKind::Answer => write!(f, "answer"),
        }
    }
}

/// Offer or answer together with the candidates gathered for it.
/// Serializes the way browsers do: `{"type": "offer", "sdp": "v=0..."}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// SDP payload with metadata, the unit exchanged out of band
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SdpPayload {
    pub sdp: SessionDescription,
    /// Attempt id picked by the host, echoed back by the joiner
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub ts: i64,
}

/// Readiness of a data channel as observed by the wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// One inbound frame from the data channel
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub data: Bytes,
    pub is_string: bool,
}

impl InboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(text.into()),
            is_string: true,
        }
    }

    /// Payload as text; binary frames are decoded lossily
    pub fn into_text(self) -> String {
        match String::from_utf8(self.data.to_vec()) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_uses_browser_field_names() {
        let desc = SessionDescription::offer("v=0\r\n");
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(json, r#"{"type":"offer","sdp":"v=0\r\n"}"#);

        let parsed: SessionDescription =
            serde_json::from_str(r#"{"type":"answer","sdp":"v=0"}"#).unwrap();
        assert_eq!(parsed, SessionDescription::answer("v=0"));
    }

    #[test]
    fn rollback_is_not_a_description_we_accept() {
        let parsed = serde_json::from_str::<SessionDescription>(r#"{"type":"rollback","sdp":""}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn binary_frames_become_lossy_text() {
        let msg = InboundMessage {
            data: Bytes::from_static(&[b'h', b'i', 0xff]),
            is_string: false,
        };
        assert_eq!(msg.into_text(), "hi\u{fffd}");
        assert_eq!(InboundMessage::text("ping").into_text(), "ping");
    }
}
