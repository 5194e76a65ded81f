//! Node configuration.
//!
//! Deliberately not a `clap` CLI. The binary takes at most one
//! argument: a path to a TOML file. No path (or no file there) falls
//! back to [`NodeConfig::default`].

use serde::{Deserialize, Serialize};

use crate::consensus::{ConsensusConfig, GenesisConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    pub difficulty: u32,
    pub fixed_reward: u64,
    pub min_entries_per_block: usize,
    pub storage_path: String,

    pub blockchain_name: String,
    pub genesis_timestamp: u64,
    #[serde(default = "default_genesis_entries")]
    pub genesis_entries: String,

    pub port: u16,
    #[serde(default)]
    pub seed_peers: Vec<String>,
    #[serde(default = "default_true")]
    pub auto_start: bool,

    pub id: String,
    pub label: String,
    pub ip: String,
    pub url: String,
    pub owner_address: String,
    #[serde(default)]
    pub web_service_port: u16,
}

fn default_genesis_entries() -> String {
    crate::types::DEFAULT_GENESIS_NOTE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            difficulty: 2,
            fixed_reward: 50,
            min_entries_per_block: 2,
            storage_path: "ledgermesh-chain.txt".to_string(),
            blockchain_name: "ledgermesh".to_string(),
            genesis_timestamp: 1_700_000_000_000,
            genesis_entries: crate::types::DEFAULT_GENESIS_NOTE.to_string(),
            port: 9000,
            seed_peers: Vec::new(),
            auto_start: true,
            id: "node-1".to_string(),
            label: "ledgermesh node".to_string(),
            ip: "127.0.0.1".to_string(),
            url: "ws://127.0.0.1:9000".to_string(),
            owner_address: String::new(),
            web_service_port: 0,
        }
    }
}

impl NodeConfig {
    /// Reads `path` as TOML, falling back to defaults if it can't be
    /// read or parsed (logged by the caller).
    pub fn load_from_path(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        toml::from_str(&contents).map_err(|e| e.to_string())
    }

    pub fn genesis_config(&self) -> GenesisConfig {
        GenesisConfig {
            blockchain_name: self.blockchain_name.clone(),
            genesis_timestamp: self.genesis_timestamp,
            genesis_entries: self.genesis_entries.clone(),
            difficulty: self.difficulty,
        }
    }

    pub fn consensus_config(&self) -> ConsensusConfig {
        ConsensusConfig {
            difficulty: self.difficulty,
            node_id: self.id.clone(),
            owner_address: self.owner_address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_internally_consistent() {
        let config = NodeConfig::default();
        assert_eq!(config.genesis_config().difficulty, config.difficulty);
        assert_eq!(config.consensus_config().node_id, config.id);
    }

    #[test]
    fn load_from_missing_path_errs() {
        assert!(NodeConfig::load_from_path("/nonexistent/path/ledgermesh.toml").is_err());
    }
}
