//! Peer registry: advertised heads, cooperative/uncooperative tracking,
//! and weighted sync-candidate selection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use rand::Rng;

use pulse_types::{PeerId, PeerInfo, WeightedPeerCandidate};

/// How long a demoted peer stays poisoned. Re-admission requires a fresh
/// advertisement stamped after demotion time plus this cooldown.
pub const UNCOOPERATIVE_COOLDOWN_MS: i64 = 600_000;

struct DemotedPeer {
    info: PeerInfo,
    demoted_at_ms: i64,
}

/// Authoritative view of which peers are viable sync sources and which are
/// poisoned for a cooldown period.
///
/// A peer id lives in at most one of the two maps. Lookups never fail;
/// mutations never fail — stale advertisements are silently dropped.
pub struct PeerRegistry {
    minimum_version: Vec<u8>,
    minimum_version_cutoff_ms: i64,
    peers: RwLock<HashMap<PeerId, PeerInfo>>,
    uncooperative: RwLock<HashMap<PeerId, DemotedPeer>>,
    scores: Mutex<HashMap<PeerId, i64>>,
}

impl PeerRegistry {
    pub fn new(minimum_version: Vec<u8>, minimum_version_cutoff_ms: i64) -> Self {
        Self {
            minimum_version,
            minimum_version_cutoff_ms,
            peers: RwLock::new(HashMap::new()),
            uncooperative: RwLock::new(HashMap::new()),
            scores: Mutex::new(HashMap::new()),
        }
    }

    // -- Peer lifecycle --------------------------------------------------------

    /// Insert or replace what a peer advertises. Advertisements from stale
    /// versions or before the version cutoff are dropped. A demoted peer is
    /// re-admitted only once its cooldown has passed.
    pub fn upsert_peer(&self, info: PeerInfo) {
        if info.version < self.minimum_version {
            tracing::debug!(peer = %info.peer_id, "dropping advertisement from stale version");
            return;
        }
        if info.timestamp_ms <= self.minimum_version_cutoff_ms {
            tracing::debug!(peer = %info.peer_id, "dropping advertisement before version cutoff");
            return;
        }

        {
            let mut uncooperative = self
                .uncooperative
                .write()
                .expect("uncooperative map lock poisoned");
            if let Some(demoted) = uncooperative.get(&info.peer_id) {
                if info.timestamp_ms < demoted.demoted_at_ms + UNCOOPERATIVE_COOLDOWN_MS {
                    return;
                }
                uncooperative.remove(&info.peer_id);
            }
        }

        let mut peers = self.peers.write().expect("peer map lock poisoned");
        peers.insert(info.peer_id.clone(), info);
    }

    /// Move a peer from the cooperative to the uncooperative map and stamp
    /// the demotion time. Idempotent; unknown peers are ignored.
    pub fn mark_uncooperative(&self, peer_id: &PeerId, now_ms: i64) {
        let removed = {
            let mut peers = self.peers.write().expect("peer map lock poisoned");
            peers.remove(peer_id)
        };
        let Some(info) = removed else {
            return;
        };
        let mut uncooperative = self
            .uncooperative
            .write()
            .expect("uncooperative map lock poisoned");
        uncooperative.entry(peer_id.clone()).or_insert(DemotedPeer {
            info,
            demoted_at_ms: now_ms,
        });
    }

    // -- Queries ---------------------------------------------------------------

    /// All cooperative peers claiming a head past `head`, weighted by how
    /// far ahead they are and shuffled by weighted sampling without
    /// replacement (key `U^(1/weight)`, descending; ties broken by peer id
    /// so one call is deterministic for a given RNG stream).
    pub fn ahead_peers<R: Rng>(&self, head: u64, rng: &mut R) -> Vec<WeightedPeerCandidate> {
        let mut candidates: Vec<(PeerId, u64)> = Vec::new();
        let mut max_diff: u64 = 0;
        {
            let peers = self.peers.read().expect("peer map lock poisoned");
            for info in peers.values() {
                if info.max_frame <= head {
                    continue;
                }
                max_diff = max_diff.max(info.max_frame - head);
                candidates.push((info.peer_id.clone(), info.max_frame));
            }
        }
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut keyed: Vec<(f64, WeightedPeerCandidate)> = candidates
            .into_iter()
            .map(|(peer_id, max_frame)| {
                let weight = (max_frame - head) as f64 / max_diff as f64;
                // Uniform on (0, 1]; gen() is [0, 1).
                let u: f64 = 1.0 - rng.gen::<f64>();
                (
                    u.powf(1.0 / weight),
                    WeightedPeerCandidate {
                        peer_id,
                        max_frame,
                        weight,
                    },
                )
            })
            .collect();
        keyed.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.peer_id.cmp(&b.1.peer_id))
        });
        keyed.into_iter().map(|(_, candidate)| candidate).collect()
    }

    pub fn is_uncooperative(&self, peer_id: &PeerId) -> bool {
        self.uncooperative
            .read()
            .expect("uncooperative map lock poisoned")
            .contains_key(peer_id)
    }

    pub fn cooperative_count(&self) -> usize {
        self.peers.read().expect("peer map lock poisoned").len()
    }

    pub fn uncooperative_count(&self) -> usize {
        self.uncooperative
            .read()
            .expect("uncooperative map lock poisoned")
            .len()
    }

    /// What the registry currently knows about a peer, if anything.
    pub fn get_peer(&self, peer_id: &PeerId) -> Option<PeerInfo> {
        self.peers
            .read()
            .expect("peer map lock poisoned")
            .get(peer_id)
            .cloned()
    }

    // -- Scores ----------------------------------------------------------------
    //
    // Called synchronously from the overlay's scoring heartbeat; the lock is
    // held for microseconds.

    pub fn get_peer_score(&self, peer_id: &PeerId) -> i64 {
        let scores = self.scores.lock().expect("score map lock poisoned");
        scores.get(peer_id).copied().unwrap_or(0)
    }

    pub fn set_peer_score(&self, peer_id: &PeerId, score: i64) {
        let mut scores = self.scores.lock().expect("score map lock poisoned");
        scores.insert(peer_id.clone(), score);
    }

    pub fn add_peer_score(&self, peer_id: &PeerId, delta: i64) {
        let mut scores = self.scores.lock().expect("score map lock poisoned");
        let score = scores.entry(peer_id.clone()).or_insert(0);
        *score = score.saturating_add(delta);
    }
}
