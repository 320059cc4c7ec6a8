//! Delay-function frame proving.
//!
//! A frame's `input` is a 516-byte header followed by one 74-byte record per
//! inclusion commitment. The header carries the difficulty, a selector
//! binding the frame to its parent, a challenge digest over everything the
//! frame commits to, and the output of an iterated-hash delay chain seeded
//! by that challenge. Verification replays the whole construction.
//!
//! Header layout:
//!
//! ```text
//! [  0..  4)  difficulty, u32 big-endian
//! [  4.. 36)  parent selector: Blake2b-256 of the previous frame's input
//! [ 36..100)  challenge: Blake2b-512 over selector ‖ number ‖ filter ‖ records ‖ proofs
//! [100..516)  delay output: SHAKE-256 expansion of the chain's final element
//! ```
//!
//! Record layout: commitment (32) ‖ frame number u64 BE (8) ‖ position
//! u16 BE (2) ‖ Blake2b-256 of the committed data (32).

use pulse_crypto::{blake2b_256, blake2b_512, shake256_expand, sign_message, verify_signature};
use pulse_types::{
    Frame, FrameFilter, InclusionAggregateProof, KeyPair, SignedProducer,
    COMMITMENT_RECORD_BYTES, FRAME_HEADER_BYTES,
};

use crate::ProverError;

/// Difficulty applied when a caller passes 0 (unset).
pub const DEFAULT_DIFFICULTY: u32 = 100_000;

const DIFFICULTY_RANGE: std::ops::Range<usize> = 0..4;
const SELECTOR_RANGE: std::ops::Range<usize> = 4..36;
const CHALLENGE_RANGE: std::ops::Range<usize> = 36..100;
const OUTPUT_RANGE: std::ops::Range<usize> = 100..FRAME_HEADER_BYTES;
const DELAY_OUTPUT_BYTES: usize = FRAME_HEADER_BYTES - 100;

/// Produces and verifies data clock frames.
pub trait FrameProver: Send + Sync {
    /// Produce the successor of `previous`, binding `aggregate_proofs` into
    /// the delay witness and signing with `proving_key`.
    fn prove_data_clock_frame(
        &self,
        previous: &Frame,
        witness_proofs: &[Vec<u8>],
        aggregate_proofs: Vec<InclusionAggregateProof>,
        proving_key: &KeyPair,
        timestamp_ms: i64,
        difficulty: u32,
    ) -> Result<Frame, ProverError>;

    /// Verify a frame's delay witness, record packing, and producer
    /// signature. Total over frames produced by `prove_data_clock_frame`.
    fn verify_data_clock_frame(&self, frame: &Frame) -> Result<(), ProverError>;
}

/// The iterated-hash delay construction.
pub struct DelayFrameProver;

impl DelayFrameProver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DelayFrameProver {
    fn default() -> Self {
        Self::new()
    }
}

/// Selector binding a successor frame to `frame`.
pub fn parent_selector(frame: &Frame) -> [u8; 32] {
    blake2b_256(&frame.input)
}

/// Build the deterministic genesis frame for `filter` from a seed.
///
/// Genesis carries no aggregate proofs and an all-zero producer signature;
/// verification special-cases frame 0.
pub fn genesis_frame(filter: FrameFilter, seed: &[u8]) -> Frame {
    let mut seed_input = Vec::with_capacity(seed.len() + 32);
    seed_input.extend_from_slice(seed);
    seed_input.extend_from_slice(filter.as_bytes());
    let challenge = blake2b_512(&seed_input);
    let mut input = vec![0u8; FRAME_HEADER_BYTES];
    input[CHALLENGE_RANGE].copy_from_slice(&challenge);
    input[OUTPUT_RANGE].copy_from_slice(&shake256_expand(&challenge, DELAY_OUTPUT_BYTES));
    Frame {
        frame_number: 0,
        timestamp: 0,
        filter,
        input,
        aggregate_proofs: vec![],
        public_key_signature: SignedProducer::genesis(),
    }
}

/// Pack one 74-byte record per inclusion commitment, in aggregate order.
fn pack_commitment_records(aggregate_proofs: &[InclusionAggregateProof]) -> Vec<u8> {
    let mut records = Vec::new();
    for aggregate in aggregate_proofs {
        for commitment in &aggregate.inclusion_commitments {
            let mut record = [0u8; COMMITMENT_RECORD_BYTES];
            let len = commitment.commitment.len().min(32);
            record[..len].copy_from_slice(&commitment.commitment[..len]);
            record[32..40].copy_from_slice(&commitment.frame_number.to_be_bytes());
            record[40..42].copy_from_slice(&(commitment.position as u16).to_be_bytes());
            record[42..74].copy_from_slice(&blake2b_256(&commitment.data));
            records.extend_from_slice(&record);
        }
    }
    records
}

/// Challenge digest over everything the frame commits to.
fn challenge_digest(
    selector: &[u8; 32],
    frame_number: u64,
    filter: &FrameFilter,
    records: &[u8],
    witness_proofs: &[Vec<u8>],
) -> [u8; 64] {
    let mut input = Vec::with_capacity(32 + 8 + 32 + records.len());
    input.extend_from_slice(selector);
    input.extend_from_slice(&frame_number.to_be_bytes());
    input.extend_from_slice(filter.as_bytes());
    input.extend_from_slice(records);
    for proof in witness_proofs {
        input.extend_from_slice(proof);
    }
    blake2b_512(&input)
}

/// Run the delay chain: `difficulty` sequential Blake2b-512 steps, then a
/// SHAKE-256 expansion of the final element.
fn delay_output(challenge: &[u8; 64], difficulty: u32) -> Vec<u8> {
    let mut element = *challenge;
    for _ in 0..difficulty {
        element = blake2b_512(&element);
    }
    shake256_expand(&element, DELAY_OUTPUT_BYTES)
}

impl FrameProver for DelayFrameProver {
    fn prove_data_clock_frame(
        &self,
        previous: &Frame,
        witness_proofs: &[Vec<u8>],
        aggregate_proofs: Vec<InclusionAggregateProof>,
        proving_key: &KeyPair,
        timestamp_ms: i64,
        difficulty: u32,
    ) -> Result<Frame, ProverError> {
        let frame_number = previous.frame_number + 1;
        for aggregate in &aggregate_proofs {
            if aggregate.frame_number != frame_number {
                return Err(ProverError::InvalidInput(format!(
                    "aggregate proof targets frame {}, proving frame {}",
                    aggregate.frame_number, frame_number
                )));
            }
        }

        let difficulty = if difficulty == 0 {
            DEFAULT_DIFFICULTY
        } else {
            difficulty
        };
        // A producer's timestamps never regress even if the wall clock does.
        let timestamp = timestamp_ms.max(previous.timestamp);

        let selector = parent_selector(previous);
        let records = pack_commitment_records(&aggregate_proofs);
        let challenge = challenge_digest(
            &selector,
            frame_number,
            &previous.filter,
            &records,
            witness_proofs,
        );

        let mut input = vec![0u8; FRAME_HEADER_BYTES + records.len()];
        input[DIFFICULTY_RANGE].copy_from_slice(&difficulty.to_be_bytes());
        input[SELECTOR_RANGE].copy_from_slice(&selector);
        input[CHALLENGE_RANGE].copy_from_slice(&challenge);
        input[OUTPUT_RANGE].copy_from_slice(&delay_output(&challenge, difficulty));
        input[FRAME_HEADER_BYTES..].copy_from_slice(&records);

        let mut frame = Frame {
            frame_number,
            timestamp,
            filter: previous.filter,
            input,
            aggregate_proofs,
            public_key_signature: SignedProducer {
                public_key: proving_key.public.clone(),
                signature: pulse_types::Signature::ZERO,
            },
        };
        frame.public_key_signature.signature =
            sign_message(&frame.signing_payload(), &proving_key.private);
        Ok(frame)
    }

    fn verify_data_clock_frame(&self, frame: &Frame) -> Result<(), ProverError> {
        if frame.input.len() < FRAME_HEADER_BYTES {
            return Err(ProverError::VerificationFailed(format!(
                "input shorter than header: {}",
                frame.input.len()
            )));
        }
        let tail = &frame.input[FRAME_HEADER_BYTES..];
        if tail.len() % COMMITMENT_RECORD_BYTES != 0 {
            return Err(ProverError::VerificationFailed(
                "input tail is not a whole number of commitment records".into(),
            ));
        }
        if frame.commitment_record_count() != frame.inclusion_commitment_count() {
            return Err(ProverError::VerificationFailed(format!(
                "{} packed records but {} inclusion commitments",
                frame.commitment_record_count(),
                frame.inclusion_commitment_count()
            )));
        }

        // Genesis is structural only: seeded challenge, no producer.
        if frame.frame_number == 0 {
            if !frame.public_key_signature.signature.is_zero() {
                return Err(ProverError::VerificationFailed(
                    "genesis frame must be unsigned".into(),
                ));
            }
            return Ok(());
        }

        let records = pack_commitment_records(&frame.aggregate_proofs);
        if records != tail {
            return Err(ProverError::VerificationFailed(
                "packed records do not match inclusion commitments".into(),
            ));
        }

        let mut selector = [0u8; 32];
        selector.copy_from_slice(&frame.input[SELECTOR_RANGE]);
        let witness_proofs: Vec<Vec<u8>> = frame
            .aggregate_proofs
            .iter()
            .map(|p| p.proof.clone())
            .collect();
        let challenge = challenge_digest(
            &selector,
            frame.frame_number,
            &frame.filter,
            &records,
            &witness_proofs,
        );
        if challenge != frame.input[CHALLENGE_RANGE] {
            return Err(ProverError::VerificationFailed(
                "challenge digest mismatch".into(),
            ));
        }

        let mut difficulty_bytes = [0u8; 4];
        difficulty_bytes.copy_from_slice(&frame.input[DIFFICULTY_RANGE]);
        let difficulty = u32::from_be_bytes(difficulty_bytes);
        if difficulty == 0 {
            return Err(ProverError::VerificationFailed(
                "zero difficulty in a non-genesis frame".into(),
            ));
        }
        if delay_output(&challenge, difficulty) != frame.input[OUTPUT_RANGE] {
            return Err(ProverError::VerificationFailed(
                "delay output mismatch".into(),
            ));
        }

        if !verify_signature(
            &frame.signing_payload(),
            &frame.public_key_signature.signature,
            &frame.public_key_signature.public_key,
        ) {
            return Err(ProverError::VerificationFailed(
                "producer signature invalid".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_crypto::keypair_from_seed;
    use pulse_types::{InclusionCommitment, INTRINSIC_EXECUTION_OUTPUT_TYPE};

    const TEST_DIFFICULTY: u32 = 64;

    fn aggregate_for(frame_number: u64) -> InclusionAggregateProof {
        InclusionAggregateProof {
            filter: FrameFilter::ZERO,
            frame_number,
            inclusion_commitments: vec![InclusionCommitment {
                filter: FrameFilter::ZERO,
                frame_number,
                type_url: INTRINSIC_EXECUTION_OUTPUT_TYPE.to_string(),
                commitment: vec![0xAB; 32],
                data: vec![1, 2, 3, 4],
                position: 0,
            }],
            proof: vec![0xCD; 192],
        }
    }

    #[test]
    fn prove_then_verify_is_total() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[1u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"test seed");

        let aggregate = aggregate_for(1);
        let frame = prover
            .prove_data_clock_frame(
                &genesis,
                &[aggregate.proof.clone()],
                vec![aggregate],
                &kp,
                1_000,
                TEST_DIFFICULTY,
            )
            .unwrap();

        assert_eq!(frame.frame_number, 1);
        assert_eq!(frame.commitment_record_count(), 1);
        prover.verify_data_clock_frame(&frame).unwrap();
    }

    #[test]
    fn genesis_verifies() {
        let prover = DelayFrameProver::new();
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        prover.verify_data_clock_frame(&genesis).unwrap();
    }

    #[test]
    fn genesis_is_deterministic() {
        assert_eq!(
            genesis_frame(FrameFilter::ZERO, b"seed"),
            genesis_frame(FrameFilter::ZERO, b"seed")
        );
        assert_ne!(
            genesis_frame(FrameFilter::ZERO, b"seed").input,
            genesis_frame(FrameFilter::ZERO, b"other").input
        );
    }

    #[test]
    fn tampered_input_fails_verification() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[2u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        let aggregate = aggregate_for(1);
        let mut frame = prover
            .prove_data_clock_frame(
                &genesis,
                &[aggregate.proof.clone()],
                vec![aggregate],
                &kp,
                1_000,
                TEST_DIFFICULTY,
            )
            .unwrap();

        frame.input[200] ^= 0xFF;
        assert!(prover.verify_data_clock_frame(&frame).is_err());
    }

    #[test]
    fn tampered_commitment_fails_verification() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[3u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        let aggregate = aggregate_for(1);
        let mut frame = prover
            .prove_data_clock_frame(
                &genesis,
                &[aggregate.proof.clone()],
                vec![aggregate],
                &kp,
                1_000,
                TEST_DIFFICULTY,
            )
            .unwrap();

        frame.aggregate_proofs[0].inclusion_commitments[0].data = vec![9, 9, 9];
        assert!(prover.verify_data_clock_frame(&frame).is_err());
    }

    #[test]
    fn foreign_signature_fails_verification() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[4u8; 32]);
        let other = keypair_from_seed(&[5u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        let aggregate = aggregate_for(1);
        let mut frame = prover
            .prove_data_clock_frame(
                &genesis,
                &[aggregate.proof.clone()],
                vec![aggregate],
                &kp,
                1_000,
                TEST_DIFFICULTY,
            )
            .unwrap();

        frame.public_key_signature.public_key = other.public;
        assert!(prover.verify_data_clock_frame(&frame).is_err());
    }

    #[test]
    fn timestamps_never_regress() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[6u8; 32]);
        let mut genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        genesis.timestamp = 5_000;

        let frame = prover
            .prove_data_clock_frame(&genesis, &[], vec![], &kp, 1_000, TEST_DIFFICULTY)
            .unwrap();
        assert_eq!(frame.timestamp, 5_000);
    }

    #[test]
    fn aggregate_for_wrong_frame_is_rejected() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[7u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        let aggregate = aggregate_for(9);
        let result = prover.prove_data_clock_frame(
            &genesis,
            &[],
            vec![aggregate],
            &kp,
            1_000,
            TEST_DIFFICULTY,
        );
        assert!(matches!(result, Err(ProverError::InvalidInput(_))));
    }

    #[test]
    fn zero_difficulty_selects_default() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[8u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        let frame = prover
            .prove_data_clock_frame(&genesis, &[], vec![], &kp, 1_000, 0)
            .unwrap();
        let mut difficulty_bytes = [0u8; 4];
        difficulty_bytes.copy_from_slice(&frame.input[0..4]);
        assert_eq!(u32::from_be_bytes(difficulty_bytes), DEFAULT_DIFFICULTY);
    }

    #[test]
    fn successor_links_to_parent() {
        let prover = DelayFrameProver::new();
        let kp = keypair_from_seed(&[9u8; 32]);
        let genesis = genesis_frame(FrameFilter::ZERO, b"seed");
        let frame = prover
            .prove_data_clock_frame(&genesis, &[], vec![], &kp, 1_000, TEST_DIFFICULTY)
            .unwrap();
        assert_eq!(&frame.input[4..36], &parent_selector(&genesis));
    }
}
