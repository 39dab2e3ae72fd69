// Application configuration
// Logging is always on in debug builds; release builds stay quiet unless RUST_LOG is set

use crate::utils::add_ice_url_scheme;
use std::time::Duration;

#[cfg(debug_assertions)]
pub const LOGGING_ENABLED: bool = true;

#[cfg(not(debug_assertions))]
pub const LOGGING_ENABLED: bool = false;

/// Label of the data channel opened by the host
pub const DEFAULT_CHANNEL_LABEL: &str = "gameChannel";

/// Upper bound on candidate gathering before an attempt fails
pub const DEFAULT_GATHERING_TIMEOUT: Duration = Duration::from_secs(30);

/// Text form produced for the out-of-band exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalFormat {
    /// gzip + base64 envelope, short enough to copy-paste or put in a QR code
    #[default]
    Compact,
    /// Bare `{"type": .., "sdp": ..}` JSON, as browsers produce it
    Json,
}

/// Settings for one connection controller
#[derive(Debug, Clone, PartialEq)]
pub struct LinkConfig {
    /// STUN/TURN servers. Empty keeps the link LAN-only.
    pub ice_servers: Vec<String>,
    pub channel_label: String,
    /// `None` waits for gathering to finish however long it takes
    pub gathering_timeout: Option<Duration>,
    /// Offer 127.0.0.1 candidates, so two peers on one machine can pair
    pub include_loopback: bool,
    pub signal_format: SignalFormat,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            channel_label: DEFAULT_CHANNEL_LABEL.to_string(),
            gathering_timeout: Some(DEFAULT_GATHERING_TIMEOUT),
            include_loopback: false,
            signal_format: SignalFormat::Compact,
        }
    }
}

impl LinkConfig {
    pub fn with_ice_servers<I, S>(mut self, servers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ice_servers = servers
            .into_iter()
            .map(|url| add_ice_url_scheme(url.as_ref()))
            .collect();
        self
    }

    pub fn with_channel_label(mut self, label: impl Into<String>) -> Self {
        self.channel_label = label.into();
        self
    }

    pub fn with_gathering_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.gathering_timeout = timeout;
        self
    }

    pub fn with_loopback(mut self, include: bool) -> Self {
        self.include_loopback = include;
        self
    }

    pub fn with_signal_format(mut self, format: SignalFormat) -> Self {
        self.signal_format = format;
        self
    }

    /// True when no traversal servers are configured
    pub fn is_lan_only(&self) -> bool {
        self.ice_servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lan_only() {
        let config = LinkConfig::default();
        assert!(config.is_lan_only());
        assert_eq!(config.channel_label, "gameChannel");
        assert_eq!(config.gathering_timeout, Some(DEFAULT_GATHERING_TIMEOUT));
        assert!(!config.include_loopback);
        assert_eq!(config.signal_format, SignalFormat::Compact);
    }

    #[test]
    fn ice_servers_get_a_scheme() {
        let config = LinkConfig::default()
            .with_ice_servers(["192.168.1.10:3478", "turn:relay.lan:3478"]);
        assert_eq!(
            config.ice_servers,
            vec!["stun:192.168.1.10:3478", "turn:relay.lan:3478"]
        );
        assert!(!config.is_lan_only());
    }
}
