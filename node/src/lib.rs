//! pulse full node — wires the consensus engine to its collaborators.
//!
//! The node owns configuration loading, logging, metrics, graceful
//! shutdown, and the tick loop that alternates collecting from ahead peers
//! with proving new frames.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;

pub use config::{EngineConfig, NodeConfig};
pub use error::NodeError;
pub use node::PulseNode;
