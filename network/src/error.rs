use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("could not open direct channel: {0}")]
    ChannelOpen(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("request timed out")]
    Timeout,

    #[error("message of {size} bytes exceeds the {limit} byte ceiling")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}
