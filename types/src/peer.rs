//! Peer records tracked by the peer registry.

use serde::{Deserialize, Serialize};

/// Opaque peer identifier assigned by the transport layer.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub Vec<u8>);

impl PeerId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PeerId(")?;
        for b in self.0.iter().take(6) {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// What a peer last advertised about its clock head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub peer_id: PeerId,
    /// Highest frame number the peer claims to hold.
    pub max_frame: u64,
    /// Milliseconds since epoch of the advertisement.
    pub timestamp_ms: i64,
    /// Advertised software version, compared lexicographically.
    pub version: Vec<u8>,
}

/// A sync candidate with its selection weight.
///
/// Weight is `(max_frame - head) / max_diff` over the candidate set, so it
/// always lands in `[0, 1]` with at least one candidate at exactly 1.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedPeerCandidate {
    pub peer_id: PeerId,
    pub max_frame: u64,
    pub weight: f64,
}
