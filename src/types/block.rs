//! Block and chain data model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::entry::Entry;
use super::hash::{has_leading_zero_nybbles, sha256_hex};

/// Literal genesis marker used when no genesis note is configured.
pub const DEFAULT_GENESIS_NOTE: &str = "Genesis Block";

/// A block's payload: either the genesis marker or a list of entries.
///
/// Modeled as a sum type rather than detecting genesis by string
/// equality, but the hash preimage still serializes byte-identically
/// to a bare JSON string for genesis so independently-implemented
/// nodes agree on the genesis hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockData {
    Genesis { note: String },
    Entries(Vec<Entry>),
}

impl BlockData {
    pub fn entries(&self) -> &[Entry] {
        match self {
            BlockData::Genesis { .. } => &[],
            BlockData::Entries(entries) => entries,
        }
    }
}

impl Serialize for BlockData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BlockData::Genesis { note } => serializer.serialize_str(note),
            BlockData::Entries(entries) => entries.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for BlockData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(note) => Ok(BlockData::Genesis { note }),
            serde_json::Value::Array(_) => {
                let entries: Vec<Entry> = serde_json::from_value(value).map_err(DeError::custom)?;
                Ok(BlockData::Entries(entries))
            }
            other => Err(DeError::custom(format!(
                "block data must be a string or an array, got {other}"
            ))),
        }
    }
}

/// Immutable record in the chain, with hash.
///
/// Field order is fixed: it is both the wire order and (save for
/// `data`, which is JSON-encoded separately) the order the hash
/// preimage concatenates fields in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    #[serde(rename = "previousHash")]
    pub previous_hash: String,
    #[serde(rename = "blockCreator")]
    pub block_creator: String,
    #[serde(rename = "ownerAddress")]
    pub owner_address: String,
    pub data: BlockData,
    pub nonce: u64,
    pub difficulty: u32,
    pub hash: String,
}

/// Outcome of a mining attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum MiningOutcome {
    Succeeded,
    Cancelled,
}

/// One-way cooperative cancellation flag for an in-flight mining attempt.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// How many nonce attempts between cooperative cancellation checks.
const MINING_YIELD_INTERVAL: u64 = 1_000;

impl Block {
    /// The fixed-prefix part of the hash preimage (everything before
    /// `nonce`), computed once per mining attempt since only the nonce
    /// changes between hash recomputations.
    fn preimage_prefix(&self) -> String {
        let data_json =
            serde_json::to_string(&self.data).expect("BlockData always serializes");
        format!(
            "{}{}{}{}{}{}",
            self.index,
            self.previous_hash,
            self.timestamp,
            self.block_creator,
            self.owner_address,
            data_json,
        )
    }

    /// Computes the block hash: SHA-256 hex of
    /// `index || previousHash || timestamp || blockCreator || ownerAddress || JSON(data) || nonce`.
    pub fn compute_hash(&self) -> String {
        let preimage = format!("{}{}", self.preimage_prefix(), self.nonce);
        sha256_hex(preimage.as_bytes())
    }

    /// Returns `true` if this block's declared `hash` is self-consistent.
    pub fn hash_is_valid(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// Returns `true` if `hash` begins with `difficulty` leading hex zeros.
    pub fn satisfies_difficulty(&self) -> bool {
        has_leading_zero_nybbles(&self.hash, self.difficulty)
    }

    /// Mines this block in place: increments `nonce` from 0, recomputing
    /// the hash each step, until it satisfies `difficulty`, yielding to
    /// `cancel` every [`MINING_YIELD_INTERVAL`] attempts.
    ///
    /// On success, `self.nonce` and `self.hash` are left at the winning
    /// values. On cancellation, their last attempted values remain and
    /// the caller must discard the block.
    pub fn mine(&mut self, cancel: &CancelToken) -> MiningOutcome {
        let prefix = self.preimage_prefix();
        let mut nonce: u64 = 0;
        loop {
            for _ in 0..MINING_YIELD_INTERVAL {
                let preimage = format!("{prefix}{nonce}");
                let hash = sha256_hex(preimage.as_bytes());
                if has_leading_zero_nybbles(&hash, self.difficulty) {
                    self.nonce = nonce;
                    self.hash = hash;
                    return MiningOutcome::Succeeded;
                }
                nonce += 1;
            }
            if cancel.is_cancelled() {
                self.nonce = nonce;
                return MiningOutcome::Cancelled;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_block(difficulty: u32) -> Block {
        Block {
            index: 1,
            timestamp: 1_700_000_000_000,
            previous_hash: "0".into(),
            block_creator: "node-a".into(),
            owner_address: "02aa".into(),
            data: BlockData::Entries(vec![]),
            nonce: 0,
            difficulty,
            hash: String::new(),
        }
    }

    #[test]
    fn genesis_data_serializes_as_bare_string() {
        let data = BlockData::Genesis {
            note: DEFAULT_GENESIS_NOTE.to_string(),
        };
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, "\"Genesis Block\"");
    }

    #[test]
    fn entries_data_serializes_as_array() {
        let data = BlockData::Entries(vec![]);
        let json = serde_json::to_string(&data).unwrap();
        assert_eq!(json, "[]");
    }

    #[test]
    fn difficulty_zero_mines_trivially() {
        let mut block = base_block(0);
        let cancel = CancelToken::new();
        assert_eq!(block.mine(&cancel), MiningOutcome::Succeeded);
        assert!(block.hash_is_valid());
        assert!(block.satisfies_difficulty());
    }

    #[test]
    fn mined_hash_is_self_consistent() {
        let mut block = base_block(1);
        let cancel = CancelToken::new();
        assert_eq!(block.mine(&cancel), MiningOutcome::Succeeded);
        assert!(block.hash_is_valid());
        assert!(block.hash.starts_with('0'));
    }

    #[test]
    fn cancellation_stops_mining() {
        let mut block = base_block(8); // unreachable within a few thousand attempts
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(block.mine(&cancel), MiningOutcome::Cancelled);
    }

    #[test]
    fn block_round_trips_through_json() {
        let mut block = base_block(1);
        block.mine(&CancelToken::new());
        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.hash, block.hash);
        assert_eq!(decoded.index, block.index);
    }
}
