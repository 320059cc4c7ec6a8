//! Clock frames and their execution inclusion proofs.
//!
//! A frame is one tick of the data clock. Its `input` carries the delay
//! witness: a fixed-size header followed by one packed record per inclusion
//! commitment bound into the tick.

use serde::{Deserialize, Serialize};

use crate::keys::{PublicKey, Signature};

/// Size of the delay-witness header at the front of [`Frame::input`].
pub const FRAME_HEADER_BYTES: usize = 516;

/// Size of one packed commitment record in the tail of [`Frame::input`].
///
/// 32-byte commitment, 8-byte frame number, 2-byte position, 32-byte data
/// digest.
pub const COMMITMENT_RECORD_BYTES: usize = 74;

/// Length of the extendable-output digest read over the serialized
/// execution output before committing.
pub const EXPANSION_BYTES: usize = 1024;

/// Chunk size used by the inclusion prover over the expansion.
pub const INCLUSION_CHUNK_BYTES: usize = 16;

/// Identifier selecting which logical clock a frame belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameFilter(pub [u8; 32]);

impl FrameFilter {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for FrameFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameFilter(")?;
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Producer identity and signature over a frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedProducer {
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl SignedProducer {
    /// The unsigned placeholder carried by the genesis frame.
    pub fn genesis() -> Self {
        Self {
            public_key: PublicKey::ZERO,
            signature: Signature::ZERO,
        }
    }
}

/// One tick of the data clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Monotonically increasing, starting at genesis 0.
    pub frame_number: u64,
    /// Milliseconds since epoch; non-decreasing across accepted frames.
    pub timestamp: i64,
    /// The logical clock this frame advances.
    pub filter: FrameFilter,
    /// Delay witness: [`FRAME_HEADER_BYTES`] header then packed
    /// [`COMMITMENT_RECORD_BYTES`] records.
    pub input: Vec<u8>,
    /// Execution inclusion proofs bound into this tick.
    pub aggregate_proofs: Vec<InclusionAggregateProof>,
    /// Producer identity + signature.
    pub public_key_signature: SignedProducer,
}

impl Frame {
    /// Number of packed commitment records in the input tail.
    ///
    /// Zero when the input is shorter than the header (malformed frames are
    /// caught by verification, not here).
    pub fn commitment_record_count(&self) -> usize {
        self.input
            .len()
            .saturating_sub(FRAME_HEADER_BYTES)
            / COMMITMENT_RECORD_BYTES
    }

    /// Total inclusion commitments across all aggregate proofs.
    pub fn inclusion_commitment_count(&self) -> usize {
        self.aggregate_proofs
            .iter()
            .map(|p| p.inclusion_commitments.len())
            .sum()
    }

    /// The bytes a producer signs: frame number, timestamp, filter, input.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload =
            Vec::with_capacity(8 + 8 + 32 + self.input.len());
        payload.extend_from_slice(&self.frame_number.to_be_bytes());
        payload.extend_from_slice(&self.timestamp.to_be_bytes());
        payload.extend_from_slice(self.filter.as_bytes());
        payload.extend_from_slice(&self.input);
        payload
    }
}

/// Aggregate inclusion proof for one frame: the commitments it binds plus
/// the aggregate opening proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionAggregateProof {
    pub filter: FrameFilter,
    pub frame_number: u64,
    pub inclusion_commitments: Vec<InclusionCommitment>,
    pub proof: Vec<u8>,
}

/// A single committed payload inside an aggregate proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionCommitment {
    pub filter: FrameFilter,
    pub frame_number: u64,
    /// Type of the committed payload (e.g. the intrinsic execution output).
    pub type_url: String,
    pub commitment: Vec<u8>,
    pub data: Vec<u8>,
    pub position: u32,
}

/// Type URL carried by commitments over the token intrinsic's output.
pub const INTRINSIC_EXECUTION_OUTPUT_TYPE: &str = "types.pulse.IntrinsicExecutionOutput";

/// Execution result digested into a frame: which intrinsic ran, its output
/// state, and the proof of the transitions applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrinsicExecutionOutput {
    pub address: [u8; 32],
    pub output: Vec<u8>,
    pub proof: Vec<u8>,
}
