use sha2::{Digest, Sha256};

/// Bytes of the digest shown to users (48 bits, 12 hex chars)
const CODE_LEN: usize = 6;

/// DTLS certificate fingerprints advertised in an SDP body, normalised to upper case
pub fn dtls_fingerprints(sdp: &str) -> Vec<String> {
    sdp.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("a=fingerprint:"))
        .map(|value| value.trim().to_ascii_uppercase())
        .collect()
}

/// Short code both peers derive from the local and remote descriptions.
///
/// The fingerprints are sorted before hashing so host and joiner end up with
/// the same code. A mismatch means the copy-pasted signals were altered.
pub fn verification_code(local_sdp: &str, remote_sdp: &str) -> Option<String> {
    let local = dtls_fingerprints(local_sdp);
    let remote = dtls_fingerprints(remote_sdp);
    if local.is_empty() || remote.is_empty() {
        return None;
    }

    let mut all: Vec<String> = local.into_iter().chain(remote).collect();
    all.sort();
    all.dedup();

    let mut hasher = Sha256::new();
    for fp in &all {
        hasher.update(fp.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    Some(hex::encode(&digest[..CODE_LEN]))
}
