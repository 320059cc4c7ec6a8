//! Engine and sync state machines.

/// Engine-wide lifecycle state, ordered so callers can test
/// `state >= Stopping` at loop tops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum EngineState {
    Starting = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl EngineState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Whether the sync engine is currently pulling from a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SyncStatus {
    Idle = 0,
    Synchronizing = 1,
}

impl SyncStatus {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Synchronizing,
            _ => Self::Idle,
        }
    }
}
