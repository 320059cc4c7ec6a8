use thiserror::Error;

use pulse_store::StoreError;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("sync: {0}")]
    Sync(String),

    #[error("prove: {0}")]
    Prove(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("frame out of order: expected {expected}, got {got}")]
    FrameOutOfOrder { expected: u64, got: u64 },

    #[error("timestamp regression: {got} < {previous}")]
    TimestampRegression { previous: i64, got: i64 },

    #[error("frame rejected: {0}")]
    FrameRejected(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}
