use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use pulse_network::{PeerRegistry, UNCOOPERATIVE_COOLDOWN_MS};
use pulse_types::{PeerId, PeerInfo};

fn info(id: u8, max_frame: u64) -> PeerInfo {
    PeerInfo {
        peer_id: PeerId::new(vec![id]),
        max_frame,
        timestamp_ms: 5_000,
        version: vec![2, 0, 0],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every returned weight is in (0, 1], the furthest peer gets exactly 1,
    /// and only genuinely-ahead peers are returned.
    #[test]
    fn ahead_weights_stay_in_unit_interval(
        head in 0u64..1000,
        offsets in prop::collection::vec(0u64..500, 1..20),
        seed in 0u64..u64::MAX,
    ) {
        let registry = PeerRegistry::new(vec![2, 0, 0], 1_000);
        for (i, offset) in offsets.iter().enumerate() {
            registry.upsert_peer(info(i as u8, head + offset));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let ahead = registry.ahead_peers(head, &mut rng);

        let expected = offsets.iter().filter(|o| **o > 0).count();
        prop_assert_eq!(ahead.len(), expected);
        for candidate in &ahead {
            prop_assert!(candidate.max_frame > head);
            prop_assert!(candidate.weight > 0.0 && candidate.weight <= 1.0);
        }
        if let Some(max_offset) = offsets.iter().max() {
            if *max_offset > 0 {
                let top = ahead
                    .iter()
                    .find(|c| c.max_frame == head + max_offset)
                    .unwrap();
                prop_assert!((top.weight - 1.0).abs() < f64::EPSILON);
            }
        }
    }

    /// A demoted peer never reappears until a fresh post-cooldown upsert,
    /// regardless of interleaved stale upserts.
    #[test]
    fn demotion_excludes_until_fresh_upsert(
        demote_at in 1_001i64..1_000_000,
        retries in prop::collection::vec(0i64..UNCOOPERATIVE_COOLDOWN_MS, 0..8),
        seed in 0u64..u64::MAX,
    ) {
        let registry = PeerRegistry::new(vec![2, 0, 0], 1_000);
        let peer = PeerId::new(vec![1]);
        registry.upsert_peer(info(1, 50));
        registry.mark_uncooperative(&peer, demote_at);

        let mut rng = StdRng::seed_from_u64(seed);
        for early in &retries {
            let mut attempt = info(1, 60);
            attempt.timestamp_ms = demote_at + early;
            registry.upsert_peer(attempt);
            prop_assert!(registry.is_uncooperative(&peer));
            prop_assert!(registry.ahead_peers(0, &mut rng).is_empty());
        }

        let mut fresh = info(1, 60);
        fresh.timestamp_ms = demote_at + UNCOOPERATIVE_COOLDOWN_MS;
        registry.upsert_peer(fresh);
        prop_assert!(!registry.is_uncooperative(&peer));
        prop_assert_eq!(registry.ahead_peers(0, &mut rng).len(), 1);
    }

    /// One RNG seed yields one candidate order.
    #[test]
    fn sampling_deterministic_per_seed(
        offsets in prop::collection::vec(1u64..500, 2..16),
        seed in 0u64..u64::MAX,
    ) {
        let registry = PeerRegistry::new(vec![2, 0, 0], 1_000);
        for (i, offset) in offsets.iter().enumerate() {
            registry.upsert_peer(info(i as u8, 100 + offset));
        }

        let a: Vec<PeerId> = registry
            .ahead_peers(100, &mut StdRng::seed_from_u64(seed))
            .into_iter()
            .map(|c| c.peer_id)
            .collect();
        let b: Vec<PeerId> = registry
            .ahead_peers(100, &mut StdRng::seed_from_u64(seed))
            .into_iter()
            .map(|c| c.peer_id)
            .collect();
        prop_assert_eq!(a, b);
    }
}
