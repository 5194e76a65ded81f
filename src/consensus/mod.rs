//! Pluggable consensus rule sets.
//!
//! [`Consensus`] is the seam the Blockchain orchestrator mines and
//! validates blocks through. Proof-of-work is the sole provided
//! variant, but the trait is narrow enough that an alternative rule set
//! (proof-of-authority, a fixed validator rotation, ...) could be dropped
//! in without touching the orchestrator.

pub mod config;
pub mod error;
pub mod pow;

pub use config::{ConsensusConfig, GenesisConfig};
pub use error::ConsensusError;
pub use pow::PowConsensus;

use crate::types::{Block, BlockData, CancelToken};

/// Rules for producing and validating blocks.
///
/// Implementations MUST be deterministic in `validate_block_hash` and
/// `validate_block_consensus`: two nodes evaluating the same block must
/// reach the same verdict.
pub trait Consensus: Send + Sync {
    /// Produces the deterministic genesis block for `config`. Every node
    /// that starts with the same `GenesisConfig` MUST produce a
    /// byte-identical block.
    fn create_genesis(&self, config: &GenesisConfig) -> Block;

    /// Builds and mines a new block at `index` on top of `previous_hash`
    /// carrying `data`. Returns `None` if `cancel` fired before a winning
    /// nonce was found.
    fn create_block(
        &self,
        index: u64,
        data: BlockData,
        previous_hash: String,
        cancel: &CancelToken,
    ) -> Option<Block>;

    /// Re-derives `block`'s hash and compares it against the declared one.
    fn validate_block_hash(&self, block: &Block) -> bool;

    /// `validate_block_hash` plus an explicit check that `block.hash`
    /// satisfies `block.difficulty`'s leading-zero-nybble prefix.
    ///
    /// A hash-only check is insufficient on its own: a peer could declare
    /// `difficulty = 0` on a block whose actual hash has no leading
    /// zeros at all, and hash self-consistency alone would accept it.
    fn validate_block_consensus(&self, block: &Block) -> bool;
}
