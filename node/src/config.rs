//! Node configuration with TOML file support.
//!
//! Engine keys use camelCase to stay wire-compatible with configuration
//! files written for other node implementations of the protocol.

use serde::{Deserialize, Serialize};

use crate::NodeError;

/// Consensus engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Hex-encoded 32-byte seed selecting the signing key used by the
    /// frame prover.
    #[serde(default)]
    pub proving_key_id: String,

    /// Hex-encoded filter identifier for this clock (32 bytes).
    #[serde(default)]
    pub filter: String,

    /// Seed for the genesis frame.
    #[serde(default = "default_genesis_seed")]
    pub genesis_seed: String,

    /// Upper bound on frames produced before voluntary halt (0 = unbounded).
    #[serde(default)]
    pub max_frames: u64,

    /// Worker count hint for commit offload.
    #[serde(default = "default_pending_commit_workers")]
    pub pending_commit_workers: i64,

    /// Gate for consensus participation.
    #[serde(default)]
    pub minimum_peers_required: usize,

    /// Per-frame sync request deadline in milliseconds; 0 selects the 4 s
    /// default.
    #[serde(default)]
    pub sync_timeout: u64,

    /// Fully verifies execution; when false the node follows the clock
    /// without producing.
    #[serde(default = "default_true")]
    pub full_prover: bool,

    /// Automatically merges coins after minting once a sufficient number
    /// has accrued.
    #[serde(default)]
    pub auto_merge_coins: bool,

    /// Delay difficulty override — testing only.
    #[serde(default)]
    pub difficulty: u32,

    // Data worker supervision is outside the consensus core; these pass
    // through to the worker supervisor untouched.
    #[serde(default)]
    pub data_worker_count: usize,

    #[serde(default)]
    pub data_worker_base_listen_port: u16,

    #[serde(default)]
    pub data_worker_base_listen_multiaddr: String,

    #[serde(default)]
    pub data_worker_memory_limit: i64,

    #[serde(default)]
    pub data_worker_multiaddrs: Vec<String>,
}

/// Configuration for a pulse node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Consensus engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to enable the Prometheus metrics endpoint.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_genesis_seed() -> String {
    "pulse genesis".to_string()
}

fn default_pending_commit_workers() -> i64 {
    4
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proving_key_id: String::new(),
            filter: String::new(),
            genesis_seed: default_genesis_seed(),
            max_frames: 0,
            pending_commit_workers: default_pending_commit_workers(),
            minimum_peers_required: 0,
            sync_timeout: 0,
            full_prover: true,
            auto_merge_coins: false,
            difficulty: 0,
            data_worker_count: 0,
            data_worker_base_listen_port: 0,
            data_worker_base_listen_multiaddr: String::new(),
            data_worker_memory_limit: 0,
            data_worker_multiaddrs: Vec::new(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }
}

impl EngineConfig {
    /// Decode a hex field into exactly 32 bytes.
    fn decode_hex_32(field: &str, value: &str) -> Result<[u8; 32], NodeError> {
        if value.is_empty() {
            return Ok([0u8; 32]);
        }
        let stripped = value.strip_prefix("0x").unwrap_or(value);
        if stripped.len() != 64 {
            return Err(NodeError::Config(format!(
                "{field} must be 32 hex-encoded bytes"
            )));
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            let pair = &stripped[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|e| NodeError::Config(format!("{field}: {e}")))?;
        }
        Ok(out)
    }

    /// The proving key seed, decoded.
    pub fn proving_key_seed(&self) -> Result<[u8; 32], NodeError> {
        Self::decode_hex_32("provingKeyId", &self.proving_key_id)
    }

    /// The frame filter, decoded.
    pub fn frame_filter(&self) -> Result<[u8; 32], NodeError> {
        Self::decode_hex_32("filter", &self.filter)
    }
}
