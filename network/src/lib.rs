//! Peer tracking and unicast sync plumbing.
//!
//! The registry decides which peers are viable sync sources; the channel
//! module carries frame-at-a-time request/response traffic between them.
//! Transport bring-up (identity, negotiation, the gossip overlay) lives
//! outside this crate behind [`DirectChannelProvider`].

pub mod channel;
pub mod error;
pub mod registry;
pub mod service;
pub mod wire;

pub use channel::{ChannelServer, DirectChannel, DirectChannelProvider, MemoryChannelNetwork};
pub use error::NetworkError;
pub use registry::{PeerRegistry, UNCOOPERATIVE_COOLDOWN_MS};
pub use service::FrameService;
pub use wire::{FrameRequest, FrameResponse, MAX_SYNC_MESSAGE_BYTES, SYNC_CHANNEL_PURPOSE};
