use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_GENESIS_NOTE;

/// Determinants of the genesis block. MUST be identical across every peer
/// on a given network or each node will mine a different, incompatible
/// genesis hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub blockchain_name: String,
    pub genesis_timestamp: u64,
    /// Text carried as the genesis block's data note. Defaults to the
    /// literal `"Genesis Block"` the wire format uses when a network
    /// doesn't care to customize it.
    #[serde(default = "default_genesis_entries")]
    pub genesis_entries: String,
    pub difficulty: u32,
}

fn default_genesis_entries() -> String {
    DEFAULT_GENESIS_NOTE.to_string()
}

impl Default for GenesisConfig {
    fn default() -> Self {
        GenesisConfig {
            blockchain_name: "ledgermesh".to_string(),
            genesis_timestamp: 1_700_000_000_000,
            genesis_entries: DEFAULT_GENESIS_NOTE.to_string(),
            difficulty: 2,
        }
    }
}

/// Per-node consensus settings: the difficulty new blocks must satisfy and
/// the identity stamped into blocks this node mines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusConfig {
    pub difficulty: u32,
    pub node_id: String,
    pub owner_address: String,
}
