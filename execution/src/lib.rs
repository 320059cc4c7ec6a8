//! The token intrinsic.
//!
//! Each proving round materializes the token application from the previous
//! frame, applies the staged transaction requests, and serializes the
//! resulting output state for digestion into the next frame.

pub mod error;
pub mod token;

pub use error::ExecutionError;
pub use token::{
    split_payload, transfer_payload, OutputState, TokenApplication, TokenRequest,
    DEFAULT_AUTO_MERGE_THRESHOLD, TOKEN_ADDRESS,
};
