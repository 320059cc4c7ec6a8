//! Abstract storage traits for the pulse protocol.
//!
//! Every storage backend implements these traits; the rest of the codebase
//! depends only on the traits. The in-memory backends here back the engine
//! in tests and solo deployments.

pub mod clock;
pub mod coin;
pub mod error;

pub use clock::{ClockStore, MemoryClockStore};
pub use coin::{CoinStore, MemoryCoinStore};
pub use error::StoreError;
