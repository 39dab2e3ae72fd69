use std::fmt;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

/// Default filter: our own diagnostics at info, the WebRTC stack only when it complains
const DEFAULT_DIRECTIVES: &str =
    "info,webrtc=warn,webrtc_ice=warn,webrtc_sctp=warn,webrtc_dtls=warn,webrtc_mdns=warn";

/// Local wall-clock timestamps with millisecond precision
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber. Log lines go to stderr so stdout stays free for signals.
///
/// Does nothing in release builds unless `RUST_LOG` is set. Calling it twice is harmless.
pub fn init() {
    let explicit = std::env::var_os("RUST_LOG").is_some();
    if !crate::config::LOGGING_ENABLED && !explicit {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime)
        .with_writer(std::io::stderr)
        .try_init();
}
