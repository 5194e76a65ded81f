use uuid::Uuid;

use crate::types::{Block, Entry, Identity};
use crate::util::now_ms;

use super::Incentive;

/// Number of confirmations a block must have before its creator is paid.
/// A reward for the block at height `H - CONFIRMATION_LAG` is issued the
/// moment the block at height `H` commits.
const CONFIRMATION_LAG: u64 = 6;

/// Minimum height at which a reward can first be issued (`H >= 7`, i.e.
/// the block at height 1 is the earliest one ever rewarded).
const MIN_REWARD_HEIGHT: u64 = CONFIRMATION_LAG + 1;

/// Fixed-amount reward credited to the creator of a block `CONFIRMATION_LAG`
/// confirmations behind the tip.
pub struct FixedRewardIncentive {
    pub fixed_reward: u64,
}

impl FixedRewardIncentive {
    pub fn new(fixed_reward: u64) -> Self {
        FixedRewardIncentive { fixed_reward }
    }
}

impl Incentive for FixedRewardIncentive {
    fn process(&self, confirmed_blocks: &[Block], height: u64) -> Option<Entry> {
        if height < MIN_REWARD_HEIGHT {
            return None;
        }
        let rewarded_height = height - CONFIRMATION_LAG;
        let rewarded_block = confirmed_blocks.get(rewarded_height as usize)?;
        debug_assert_eq!(rewarded_block.index, rewarded_height);

        Some(Entry::new_system(
            Uuid::new_v4().to_string(),
            Identity::Incentive,
            Identity::PublicKey(rewarded_block.owner_address.clone()),
            self.fixed_reward,
            "reward".to_string(),
            now_ms(),
            serde_json::Value::Null,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockData;

    fn block(index: u64, owner: &str) -> Block {
        Block {
            index,
            timestamp: 0,
            previous_hash: "prev".into(),
            block_creator: owner.into(),
            owner_address: owner.into(),
            data: BlockData::Entries(vec![]),
            nonce: 0,
            difficulty: 0,
            hash: "hash".into(),
        }
    }

    fn chain_of(height: u64) -> Vec<Block> {
        (0..=height).map(|i| block(i, &format!("owner-{i}"))).collect()
    }

    #[test]
    fn no_reward_below_height_seven() {
        let incentive = FixedRewardIncentive::new(50);
        for h in 0..7 {
            let chain = chain_of(h);
            assert!(incentive.process(&chain, h).is_none());
        }
    }

    #[test]
    fn reward_issued_for_block_six_confirmations_back() {
        let incentive = FixedRewardIncentive::new(50);
        let chain = chain_of(7);
        let entry = incentive.process(&chain, 7).expect("reward due at height 7");
        assert_eq!(entry.from, Identity::Incentive);
        assert_eq!(entry.to, Identity::PublicKey("owner-1".into()));
        assert_eq!(entry.amount, 50);
        assert!(entry.signature.is_none());
        assert_eq!(entry.compute_hash(), entry.hash);
    }
}
