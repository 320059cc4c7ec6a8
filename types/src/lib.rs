//! Fundamental types for the pulse data-clock protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: clock frames and their inclusion proofs, peer records, coins,
//! keys, prover tries, and the protocol constants governing the frame wire
//! shape.

pub mod coin;
pub mod frame;
pub mod keys;
pub mod peer;
pub mod time;
pub mod trie;

pub use coin::{Coin, CoinId};
pub use frame::{
    Frame, FrameFilter, InclusionAggregateProof, InclusionCommitment, IntrinsicExecutionOutput,
    SignedProducer, COMMITMENT_RECORD_BYTES, EXPANSION_BYTES, FRAME_HEADER_BYTES,
    INCLUSION_CHUNK_BYTES, INTRINSIC_EXECUTION_OUTPUT_TYPE,
};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use peer::{PeerId, PeerInfo, WeightedPeerCandidate};
pub use time::{millis_since, now_millis};
pub use trie::ProverTrie;
