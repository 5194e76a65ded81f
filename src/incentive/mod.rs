//! Pluggable reward issuance.

pub mod fixed_reward;

pub use fixed_reward::FixedRewardIncentive;

use crate::types::{Block, Entry};

/// Computes the reward entry (if any) due after a block at `height` is
/// committed locally.
///
/// Deliberately a pure function rather than a subscriber with a
/// back-reference to the Blockchain: it is handed exactly the slice of
/// chain state it needs (`confirmed_blocks`, indexed so that
/// `confirmed_blocks[i].index == i`) and returns the entry for the
/// orchestrator to insert, rather than mutating the pool itself.
pub trait Incentive: Send + Sync {
    /// `confirmed_blocks` is the chain up to and including the
    /// just-committed block at `height`. Returns the reward entry to
    /// queue into the pool, or `None` if no reward is due yet.
    fn process(&self, confirmed_blocks: &[Block], height: u64) -> Option<Entry>;
}
