use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] pulse_consensus::ConsensusError),

    #[error("store error: {0}")]
    Store(#[from] pulse_store::StoreError),

    #[error("network error: {0}")]
    Network(#[from] pulse_network::NetworkError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid proving key: {0}")]
    ProvingKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
