use thiserror::Error;

use pulse_store::StoreError;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("previous frame producer is not in the active prover set")]
    UnknownProducer,

    #[error("serialization error: {0}")]
    Serialization(String),
}
