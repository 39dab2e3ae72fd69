//! Text form of session descriptions for the out-of-band exchange.
//!
//! The compact form is the payload serialized to JSON, gzip-compressed and
//! base64-encoded. Input starting with `{` is read as plain JSON instead, either
//! a full payload or a bare browser-style description.

use crate::config::SignalFormat;
use crate::peer::types::{SdpKind, SdpPayload, SessionDescription};
use base64::{engine::general_purpose, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::Deserialize;
use std::io::{Read, Write};

/// Decompression limit, guards against zip bombs
pub const MAX_DECOMPRESSED_SIZE: u64 = 256 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("signal text is empty")]
    Empty,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid compressed payload: {0}")]
    Compression(#[from] std::io::Error),
    #[error("decompressed payload exceeds {} bytes", MAX_DECOMPRESSED_SIZE)]
    TooLarge,
    #[error("invalid description JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("description has an empty SDP body")]
    EmptySdp,
    #[error("expected an {expected} but got an {actual}")]
    UnexpectedKind { expected: SdpKind, actual: SdpKind },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wire {
    Payload(SdpPayload),
    Bare(SessionDescription),
}

pub fn encode(payload: &SdpPayload, format: SignalFormat) -> Result<String, SignalError> {
    match format {
        SignalFormat::Json => Ok(serde_json::to_string(&payload.sdp)?),
        SignalFormat::Compact => {
            // 1. JSON -> bytes
            let json = serde_json::to_vec(payload)?;

            // 2. GZIP compress
            let mut gz = GzEncoder::new(Vec::new(), Compression::fast());
            gz.write_all(&json)?;
            let compressed = gz.finish()?;

            // 3. base64
            Ok(general_purpose::STANDARD.encode(compressed))
        }
    }
}

pub fn decode(text: &str) -> Result<SdpPayload, SignalError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SignalError::Empty);
    }

    let payload = if text.starts_with('{') {
        from_json(text.as_bytes())?
    } else {
        from_compact(text)?
    };

    if payload.sdp.sdp.trim().is_empty() {
        return Err(SignalError::EmptySdp);
    }
    Ok(payload)
}

/// Decode and require a particular kind of description
pub fn decode_kind(text: &str, expected: SdpKind) -> Result<SdpPayload, SignalError> {
    let payload = decode(text)?;
    if payload.sdp.kind != expected {
        return Err(SignalError::UnexpectedKind {
            expected,
            actual: payload.sdp.kind,
        });
    }
    Ok(payload)
}

fn from_compact(text: &str) -> Result<SdpPayload, SignalError> {
    // 1. base64 -> bytes
    let compressed = general_purpose::STANDARD.decode(text)?;

    // 2. gunzip, reading one byte past the limit to detect overflow
    let mut json = Vec::new();
    GzDecoder::new(&compressed[..])
        .take(MAX_DECOMPRESSED_SIZE + 1)
        .read_to_end(&mut json)?;
    if json.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(SignalError::TooLarge);
    }

    // 3. JSON -> struct
    from_json(&json)
}

fn from_json(json: &[u8]) -> Result<SdpPayload, SignalError> {
    let payload = match serde_json::from_slice::<Wire>(json) {
        Ok(Wire::Payload(payload)) => payload,
        Ok(Wire::Bare(sdp)) => SdpPayload {
            sdp,
            id: String::new(),
            ts: 0,
        },
        // untagged errors say nothing useful, report the payload's own error
        Err(_) => serde_json::from_slice::<SdpPayload>(json)?,
    };
    Ok(payload)
}
