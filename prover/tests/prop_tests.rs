use proptest::prelude::*;

use pulse_crypto::shake256_expand;
use pulse_prover::{
    genesis_frame, DelayFrameProver, FrameProver, InclusionProver, MerkleInclusionProver,
};
use pulse_types::{FrameFilter, EXPANSION_BYTES, INCLUSION_CHUNK_BYTES};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any committed vector opens at any in-range position.
    #[test]
    fn commit_open_verify_roundtrip(
        data in prop::collection::vec(0u8.., 1..512),
        chunk_size in 1usize..64,
        position_seed in 0usize..1024,
    ) {
        let prover = MerkleInclusionProver::new();
        let chunks = data.len().div_ceil(chunk_size);
        let position = position_seed % chunks;

        let commitment = prover.commit_raw(&data, chunk_size).unwrap();
        let proof = prover.prove_raw(&data, position, chunk_size).unwrap();

        let start = position * chunk_size;
        let end = (start + chunk_size).min(data.len());
        let mut chunk = vec![0u8; chunk_size];
        chunk[..end - start].copy_from_slice(&data[start..end]);

        prover.verify_raw(&commitment, position, &chunk, &proof).unwrap();
    }

    /// The replayable-position rule holds for arbitrary digest inputs:
    /// expanding, committing, and opening at expand[0] % 16 always verifies.
    #[test]
    fn derived_position_always_verifies(seed in prop::collection::vec(0u8.., 1..128)) {
        let prover = MerkleInclusionProver::new();
        let expand = shake256_expand(&seed, EXPANSION_BYTES);
        let position = (expand[0] % 16) as usize;

        let commitment = prover.commit_raw(&expand, INCLUSION_CHUNK_BYTES).unwrap();
        let proof = prover.prove_raw(&expand, position, INCLUSION_CHUNK_BYTES).unwrap();
        let chunk = &expand[position * INCLUSION_CHUNK_BYTES..(position + 1) * INCLUSION_CHUNK_BYTES];

        prover.verify_raw(&commitment, position, chunk, &proof).unwrap();
    }

    /// Distinct vectors yield distinct commitments.
    #[test]
    fn commitments_bind_content(
        data in prop::collection::vec(0u8.., 16..256),
        flip in 0usize..4096,
    ) {
        let prover = MerkleInclusionProver::new();
        let mut tampered = data.clone();
        let idx = flip % tampered.len();
        tampered[idx] ^= 0x01;

        let a = prover.commit_raw(&data, INCLUSION_CHUNK_BYTES).unwrap();
        let b = prover.commit_raw(&tampered, INCLUSION_CHUNK_BYTES).unwrap();
        prop_assert_ne!(a, b);
    }

    /// Genesis frames differ per seed but are stable per seed.
    #[test]
    fn genesis_stability(seed in prop::collection::vec(0u8.., 1..64)) {
        let a = genesis_frame(FrameFilter::ZERO, &seed);
        let b = genesis_frame(FrameFilter::ZERO, &seed);
        prop_assert_eq!(&a, &b);
        let frame_prover = DelayFrameProver::new();
        frame_prover.verify_data_clock_frame(&a).unwrap();
    }
}
