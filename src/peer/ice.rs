use crate::peer::types::SessionDescription;
use tracing::{info, warn};

/// Candidate counts by type in one description
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CandidateSummary {
    pub host: usize,
    pub srflx: usize,
    pub prflx: usize,
    pub relay: usize,
}

impl CandidateSummary {
    pub fn total(&self) -> usize {
        self.host + self.srflx + self.prflx + self.relay
    }
}

/// Count `a=candidate` lines by their `typ` attribute
pub fn summarize(sdp: &str) -> CandidateSummary {
    let mut summary = CandidateSummary::default();

    for line in sdp.lines().map(str::trim) {
        let Some(candidate) = line.strip_prefix("a=candidate:") else {
            continue;
        };
        let typ = candidate
            .split_whitespace()
            .skip_while(|field| *field != "typ")
            .nth(1);
        match typ {
            Some("host") => summary.host += 1,
            Some("srflx") => summary.srflx += 1,
            Some("prflx") => summary.prflx += 1,
            Some("relay") => summary.relay += 1,
            _ => {}
        }
    }

    summary
}

/// Log what gathering produced for a finalized description
pub fn analyze_candidates(desc: &SessionDescription) -> CandidateSummary {
    let summary = summarize(&desc.sdp);

    info!(
        "Candidate analysis for {}: {} host, {} srflx, {} prflx, {} relay",
        desc.kind, summary.host, summary.srflx, summary.prflx, summary.relay
    );

    if summary.host == 0 {
        warn!("No host candidates gathered, a LAN connection cannot be established");
    }

    summary
}
