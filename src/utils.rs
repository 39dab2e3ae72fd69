use rand::Rng;

/// Random identifier attached to an offer and echoed in the answer
pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

/// Seconds since the Unix epoch, stamped on every signal
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

// Add a protocol scheme to an ICE server URL when it is missing
pub fn add_ice_url_scheme(url: &str) -> String {
    const SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];
    let url = url.trim();
    if SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        url.to_string()
    } else {
        format!("stun:{}", url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_hex_and_distinct() {
        let a = random_id();
        let b = random_id();
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn scheme_is_added_only_when_missing() {
        assert_eq!(add_ice_url_scheme("10.0.0.1:3478"), "stun:10.0.0.1:3478");
        assert_eq!(add_ice_url_scheme("stun:10.0.0.1:3478"), "stun:10.0.0.1:3478");
        assert_eq!(add_ice_url_scheme("turns:relay:5349"), "turns:relay:5349");
        assert_eq!(add_ice_url_scheme(" turn:relay:3478 "), "turn:relay:3478");
    }
}
