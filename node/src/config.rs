//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use dirchain_types::{Hash32, IdentityChainId, KeyPair, NetworkId, ProtocolParams};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a dirchain node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to join.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Data directory for the block store and journal.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Hex Ed25519 seed of this node's identity key. Without one the node
    /// follows but never signs.
    #[serde(default)]
    pub identity_seed: Option<String>,

    /// Hex identity chain ids of the federated servers at startup.
    #[serde(default)]
    pub federated_servers: Vec<String>,

    /// Minute whose end-of-minute message closes a height.
    #[serde(default = "default_last_minute")]
    pub last_minute: u8,

    #[serde(default = "default_minute_duration_ms")]
    pub minute_duration_ms: u64,

    /// Sleep when a validator pass finds nothing to do.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,

    /// Upper bound on state-advance operations per validator pass.
    #[serde(default = "default_drain_limit")]
    pub drain_limit: usize,

    /// Capacity of the inbound network message queue.
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,

    /// Write every delivered message to the journal.
    #[serde(default = "default_true")]
    pub journal: bool,

    /// Re-inject the existing journal on startup before going live.
    #[serde(default)]
    pub replay_journal: bool,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Local
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./dirchain_data")
}

fn default_last_minute() -> u8 {
    ProtocolParams::DEFAULT_LAST_MINUTE
}

fn default_minute_duration_ms() -> u64 {
    60_000
}

fn default_idle_delay_ms() -> u64 {
    10
}

fn default_drain_limit() -> usize {
    10
}

fn default_inbound_capacity() -> usize {
    4096
}

fn default_true() -> bool {
    true
}

fn default_map_size() -> usize {
    dirchain_store_lmdb::DEFAULT_MAP_SIZE
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.last_minute == 0 {
            return Err(NodeError::Config("last_minute must be at least 1".into()));
        }
        if self.minute_duration_ms == 0 {
            return Err(NodeError::Config("minute_duration_ms must be positive".into()));
        }
        if self.drain_limit == 0 {
            return Err(NodeError::Config("drain_limit must be positive".into()));
        }
        if self.inbound_capacity == 0 {
            return Err(NodeError::Config("inbound_capacity must be positive".into()));
        }
        self.identity()?;
        self.federated_server_ids()?;
        self.log_format()?;
        Ok(())
    }

    pub fn params(&self) -> ProtocolParams {
        ProtocolParams {
            last_minute: self.last_minute,
            minute_duration_ms: self.minute_duration_ms,
            ..ProtocolParams::default()
        }
    }

    pub fn identity(&self) -> Result<Option<KeyPair>, NodeError> {
        self.identity_seed
            .as_deref()
            .map(|seed| {
                dirchain_crypto::keypair_from_hex(seed)
                    .map_err(|e| NodeError::Config(format!("identity_seed: {e}")))
            })
            .transpose()
    }

    pub fn federated_server_ids(&self) -> Result<Vec<IdentityChainId>, NodeError> {
        self.federated_servers
            .iter()
            .map(|s| {
                Hash32::from_str(s)
                    .map_err(|e| NodeError::Config(format!("federated server {s}: {e}")))
            })
            .collect()
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("journal.jsonl")
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            data_dir: default_data_dir(),
            identity_seed: None,
            federated_servers: Vec::new(),
            last_minute: default_last_minute(),
            minute_duration_ms: default_minute_duration_ms(),
            idle_delay_ms: default_idle_delay_ms(),
            drain_limit: default_drain_limit(),
            inbound_capacity: default_inbound_capacity(),
            journal: default_true(),
            replay_journal: false,
            map_size: default_map_size(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.last_minute, config.last_minute);
        assert_eq!(parsed.drain_limit, config.drain_limit);
        assert_eq!(parsed.network, config.network);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.last_minute, 10);
        assert_eq!(config.idle_delay_ms, 10);
        assert_eq!(config.log_format, "human");
        assert!(config.identity().unwrap().is_none());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            network = "test"
            last_minute = 3
            federated_servers = ["0000000000000000000000000000000000000000000000000000000000000001"]
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.network, NetworkId::Test);
        assert_eq!(config.params().last_minute, 3);
        assert_eq!(config.federated_server_ids().unwrap().len(), 1);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn bad_values_are_config_errors() {
        for toml in [
            "last_minute = 0",
            "identity_seed = \"zz\"",
            "federated_servers = [\"abc\"]",
            "log_format = \"xml\"",
        ] {
            assert!(
                matches!(NodeConfig::from_toml_str(toml), Err(NodeError::Config(_))),
                "{toml} should be rejected"
            );
        }
    }

    #[test]
    fn identity_seed_yields_keypair() {
        let config = NodeConfig {
            identity_seed: Some("07".repeat(32)),
            ..NodeConfig::default()
        };
        let kp = config.identity().unwrap().unwrap();
        assert_eq!(kp.public, dirchain_crypto::keypair_from_seed(&[7; 32]).public);
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/dirchain.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
