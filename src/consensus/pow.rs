use crate::types::{Block, BlockData, CancelToken, DEFAULT_GENESIS_NOTE, MiningOutcome};
use crate::util::now_ms;

use super::config::{ConsensusConfig, GenesisConfig};
use super::Consensus;

/// Proof-of-work consensus: blocks are accepted once their hash carries
/// `difficulty` leading hex zeros, found by brute-force nonce search.
pub struct PowConsensus {
    config: ConsensusConfig,
}

impl PowConsensus {
    pub fn new(config: ConsensusConfig) -> Self {
        PowConsensus { config }
    }
}

impl Consensus for PowConsensus {
    fn create_genesis(&self, config: &GenesisConfig) -> Block {
        let mut block = Block {
            index: 0,
            timestamp: config.genesis_timestamp,
            previous_hash: "0".to_string(),
            block_creator: DEFAULT_GENESIS_NOTE.to_string(),
            owner_address: DEFAULT_GENESIS_NOTE.to_string(),
            data: BlockData::Genesis {
                note: config.genesis_entries.clone(),
            },
            nonce: 0,
            difficulty: config.difficulty,
            hash: String::new(),
        };
        // Genesis mining happens before any peer connection exists, so
        // there is nothing to cancel it.
        block.mine(&CancelToken::new());
        block
    }

    fn create_block(
        &self,
        index: u64,
        data: BlockData,
        previous_hash: String,
        cancel: &CancelToken,
    ) -> Option<Block> {
        let mut block = Block {
            index,
            timestamp: now_ms(),
            previous_hash,
            block_creator: self.config.node_id.clone(),
            owner_address: self.config.owner_address.clone(),
            data,
            nonce: 0,
            difficulty: self.config.difficulty,
            hash: String::new(),
        };
        match block.mine(cancel) {
            MiningOutcome::Succeeded => Some(block),
            MiningOutcome::Cancelled => None,
        }
    }

    fn validate_block_hash(&self, block: &Block) -> bool {
        block.hash_is_valid()
    }

    fn validate_block_consensus(&self, block: &Block) -> bool {
        self.validate_block_hash(block) && block.satisfies_difficulty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus() -> PowConsensus {
        PowConsensus::new(ConsensusConfig {
            difficulty: 1,
            node_id: "node-a".into(),
            owner_address: "02aa".into(),
        })
    }

    #[test]
    fn genesis_is_deterministic_for_identical_config() {
        let genesis_config = GenesisConfig::default();
        let a = consensus().create_genesis(&genesis_config);
        let b = consensus().create_genesis(&genesis_config);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.nonce, b.nonce);
        assert_eq!(a.index, 0);
        assert_eq!(a.previous_hash, "0");
    }

    #[test]
    fn create_block_mines_a_valid_successor() {
        let c = consensus();
        let genesis = c.create_genesis(&GenesisConfig::default());
        let cancel = CancelToken::new();
        let block = c
            .create_block(1, BlockData::Entries(vec![]), genesis.hash.clone(), &cancel)
            .expect("mining should succeed when not cancelled");
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis.hash);
        assert!(c.validate_block_consensus(&block));
    }

    #[test]
    fn create_block_returns_none_when_cancelled_up_front() {
        let c = PowConsensus::new(ConsensusConfig {
            difficulty: 8, // unreachable within the test's time budget
            node_id: "node-a".into(),
            owner_address: "02aa".into(),
        });
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = c.create_block(1, BlockData::Entries(vec![]), "0".into(), &cancel);
        assert!(result.is_none());
    }

    #[test]
    fn validate_block_consensus_rejects_spoofed_zero_difficulty() {
        let c = consensus();
        let mut block = c.create_genesis(&GenesisConfig::default());
        // Simulate a peer declaring difficulty 0 on a hash that does not
        // actually carry a zero prefix for that (lower) difficulty... here
        // we construct the inverse: claim a higher difficulty than the
        // hash satisfies.
        block.difficulty = block.difficulty + 1;
        assert!(!c.validate_block_consensus(&block));
    }
}
