use proptest::prelude::*;

use pulse_types::{
    Frame, FrameFilter, PeerId, PublicKey, Signature, SignedProducer, COMMITMENT_RECORD_BYTES,
    FRAME_HEADER_BYTES,
};

fn frame_with_input(input: Vec<u8>) -> Frame {
    Frame {
        frame_number: 1,
        timestamp: 1000,
        filter: FrameFilter::ZERO,
        input,
        aggregate_proofs: vec![],
        public_key_signature: SignedProducer::genesis(),
    }
}

proptest! {
    /// FrameFilter roundtrip: new -> as_bytes produces identical bytes.
    #[test]
    fn frame_filter_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let filter = FrameFilter::new(bytes);
        prop_assert_eq!(filter.as_bytes(), &bytes);
    }

    /// The commitment record count is the tail length over the record stride.
    #[test]
    fn commitment_record_count_matches_stride(records in 0usize..16) {
        let input = vec![0u8; FRAME_HEADER_BYTES + records * COMMITMENT_RECORD_BYTES];
        let frame = frame_with_input(input);
        prop_assert_eq!(frame.commitment_record_count(), records);
    }

    /// Inputs shorter than the header never underflow the record count.
    #[test]
    fn short_input_counts_zero_records(len in 0usize..FRAME_HEADER_BYTES) {
        let frame = frame_with_input(vec![0u8; len]);
        prop_assert_eq!(frame.commitment_record_count(), 0);
    }

    /// The signing payload is a stable function of the signed fields.
    #[test]
    fn signing_payload_deterministic(
        frame_number in 0u64..u64::MAX,
        timestamp in 0i64..i64::MAX,
        input in prop::collection::vec(0u8.., 0..64),
    ) {
        let mut frame = frame_with_input(input);
        frame.frame_number = frame_number;
        frame.timestamp = timestamp;
        prop_assert_eq!(frame.signing_payload(), frame.signing_payload());
        prop_assert_eq!(
            frame.signing_payload().len(),
            8 + 8 + 32 + frame.input.len()
        );
    }

    /// Frame bincode serialization roundtrip.
    #[test]
    fn frame_bincode_roundtrip(
        frame_number in 0u64..1_000_000,
        timestamp in 0i64..i64::MAX / 2,
        input in prop::collection::vec(0u8.., 0..128),
    ) {
        let mut frame = frame_with_input(input);
        frame.frame_number = frame_number;
        frame.timestamp = timestamp;
        let encoded = bincode::serialize(&frame).unwrap();
        let decoded: Frame = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, frame);
    }

    /// PeerId ordering is the byte ordering (stable tie-breaking for the
    /// weighted sampler depends on this).
    #[test]
    fn peer_id_ordering_is_byte_ordering(
        a in prop::collection::vec(0u8.., 1..8),
        b in prop::collection::vec(0u8.., 1..8),
    ) {
        let pa = PeerId::new(a.clone());
        let pb = PeerId::new(b.clone());
        prop_assert_eq!(pa.cmp(&pb), a.cmp(&b));
    }

    /// Signature serde roundtrip through bincode.
    #[test]
    fn signature_bincode_roundtrip(seed in 0u8..) {
        let sig = Signature([seed; 64]);
        let encoded = bincode::serialize(&sig).unwrap();
        let decoded: Signature = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, sig);
    }
}

#[test]
fn genesis_producer_is_zeroed() {
    let producer = SignedProducer::genesis();
    assert!(producer.public_key.is_zero());
    assert!(producer.signature.is_zero());
    assert_eq!(producer.public_key, PublicKey::ZERO);
}
