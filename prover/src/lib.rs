//! Frame proving and inclusion proving for the pulse data clock.
//!
//! The frame prover binds execution commitments into a delay witness and
//! signs the result; the inclusion prover commits to byte vectors and opens
//! them at a position. Both are behind traits so the constructions can be
//! swapped without touching the consensus engine.

pub mod error;
pub mod frame;
pub mod inclusion;

pub use error::ProverError;
pub use frame::{
    genesis_frame, parent_selector, DelayFrameProver, FrameProver, DEFAULT_DIFFICULTY,
};
pub use inclusion::{InclusionProver, MerkleInclusionProver};
