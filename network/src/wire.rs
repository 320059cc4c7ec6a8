//! Wire messages for the frame sync service.

use serde::{Deserialize, Serialize};

use pulse_types::Frame;

use crate::NetworkError;

/// Purpose tag for direct sync channels.
pub const SYNC_CHANNEL_PURPOSE: &str = "sync";

/// Ceiling on a single sync message. Frames plus proofs can be large.
pub const MAX_SYNC_MESSAGE_BYTES: usize = 600 * 1024 * 1024;

/// Request one frame by number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRequest {
    pub frame_number: u64,
}

/// Response carrying the requested frame, or nothing if the peer does not
/// hold it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameResponse {
    pub frame: Option<Frame>,
}

impl FrameResponse {
    /// Encode for the wire, enforcing the message size ceiling.
    pub fn encode(&self) -> Result<Vec<u8>, NetworkError> {
        let bytes =
            bincode::serialize(self).map_err(|e| NetworkError::Serialization(e.to_string()))?;
        if bytes.len() > MAX_SYNC_MESSAGE_BYTES {
            return Err(NetworkError::MessageTooLarge {
                size: bytes.len(),
                limit: MAX_SYNC_MESSAGE_BYTES,
            });
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NetworkError> {
        if bytes.len() > MAX_SYNC_MESSAGE_BYTES {
            return Err(NetworkError::MessageTooLarge {
                size: bytes.len(),
                limit: MAX_SYNC_MESSAGE_BYTES,
            });
        }
        bincode::deserialize(bytes).map_err(|e| NetworkError::Serialization(e.to_string()))
    }
}
