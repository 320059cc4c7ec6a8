//! Data-clock consensus engine.
//!
//! The engine advances a per-filter clock by producing signed frames at
//! fixed logical intervals, reconciles local state against peers claiming
//! more advanced clocks, and constructs a cryptographic execution proof for
//! each frame.

pub mod engine;
pub mod error;
pub mod state;
pub mod sync;
pub mod time_reel;

pub use engine::{DataClockEngine, EngineOptions};
pub use error::ConsensusError;
pub use state::{EngineState, SyncStatus};
pub use sync::DEFAULT_SYNC_TIMEOUT;
pub use time_reel::TimeReel;
