use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("invalid prover input: {0}")]
    InvalidInput(String),

    #[error("frame verification failed: {0}")]
    VerificationFailed(String),

    #[error("inclusion proof rejected: {0}")]
    InclusionRejected(String),
}
