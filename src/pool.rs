//! Entry pool: dedup, validate, and buffer pending entries.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::types::{Block, Entry, EntryLocation, EntryValidationError, EntryView};

/// Result of submitting an entry to the pool.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Newly accepted and queued, carrying its (possibly just-assigned) id.
    Inserted(String),
    /// An entry with this `entryId` was already queued; the submission is
    /// a no-op.
    Duplicate,
    /// Failed validation and was dropped silently.
    Rejected(EntryValidationError),
}

/// Buffer of pending entries, keyed by `entryId`, preserving insertion
/// order for deterministic block construction.
pub struct EntryPool {
    entries: IndexMap<String, Entry>,
    min_entries_per_block: usize,
}

impl EntryPool {
    pub fn new(min_entries_per_block: usize) -> Self {
        EntryPool {
            entries: IndexMap::new(),
            min_entries_per_block,
        }
    }

    /// Assigns an `entryId` if the entry arrived without one, skips
    /// already-seen entries, and otherwise validates and queues.
    pub fn submit(&mut self, mut entry: Entry, now_ms: i64) -> SubmitOutcome {
        if entry.entry_id.is_empty() {
            entry.entry_id = Uuid::new_v4().to_string();
        }
        if self.entries.contains_key(&entry.entry_id) {
            return SubmitOutcome::Duplicate;
        }
        match entry.validate(now_ms) {
            Ok(()) => {
                let entry_id = entry.entry_id.clone();
                self.entries.insert(entry_id.clone(), entry);
                SubmitOutcome::Inserted(entry_id)
            }
            Err(err) => SubmitOutcome::Rejected(err),
        }
    }

    /// Snapshot of queued entries in insertion order.
    pub fn pending(&self) -> Vec<Entry> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` once the pool holds enough entries to trigger mining.
    pub fn should_trigger_mining(&self) -> bool {
        self.entries.len() >= self.min_entries_per_block
    }

    /// Removes every entry whose id appears in `block`'s data. A no-op
    /// for genesis blocks, which carry no entries.
    pub fn prune(&mut self, block: &Block) {
        for entry in block.data.entries() {
            self.entries.shift_remove(&entry.entry_id);
        }
    }

    /// Prunes against every block in a newly adopted chain, for the
    /// replace-chain path where many blocks commit at once.
    pub fn on_new_peer_chain(&mut self, chain: &[Block]) {
        for block in chain {
            self.prune(block);
        }
    }

    /// Looks up a pending entry by id, for the query surface's
    /// `entry_by_id` when the entry hasn't been confirmed yet.
    pub fn view_by_id(&self, entry_id: &str) -> Option<EntryView> {
        self.entries.get(entry_id).map(|entry| EntryView {
            entry: entry.clone(),
            location: EntryLocation::Pending,
            validity: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockData, Identity};

    fn system_entry(id: &str, amount: u64, ts: u64) -> Entry {
        Entry::new_system(
            id.to_string(),
            Identity::Ico,
            Identity::PublicKey("02aa".into()),
            amount,
            "crypto".into(),
            ts,
            serde_json::json!({}),
        )
    }

    #[test]
    fn submitting_twice_is_idempotent() {
        let mut pool = EntryPool::new(2);
        let entry = system_entry("e1", 10, 1_700_000_000_000);
        assert!(matches!(pool.submit(entry.clone(), 1_700_000_000_000), SubmitOutcome::Inserted(_)));
        assert!(matches!(pool.submit(entry, 1_700_000_000_000), SubmitOutcome::Duplicate));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn invalid_entry_is_rejected_and_not_queued() {
        let mut pool = EntryPool::new(1);
        let mut entry = system_entry("e2", 10, 1_700_000_000_000);
        entry.amount = 999; // tamper so the hash no longer matches
        let outcome = pool.submit(entry, 1_700_000_000_000);
        assert!(matches!(outcome, SubmitOutcome::Rejected(EntryValidationError::HashMismatch)));
        assert!(pool.is_empty());
    }

    #[test]
    fn mining_trigger_boundary_at_exact_threshold() {
        let mut pool = EntryPool::new(2);
        pool.submit(system_entry("e3", 1, 1_700_000_000_000), 1_700_000_000_000);
        assert!(!pool.should_trigger_mining());
        pool.submit(system_entry("e4", 1, 1_700_000_000_000), 1_700_000_000_000);
        assert!(pool.should_trigger_mining());
    }

    #[test]
    fn prune_removes_entries_contained_in_a_committed_block() {
        let mut pool = EntryPool::new(1);
        let entry = system_entry("e5", 1, 1_700_000_000_000);
        pool.submit(entry.clone(), 1_700_000_000_000);
        assert_eq!(pool.len(), 1);

        let block = crate::types::Block {
            index: 1,
            timestamp: 0,
            previous_hash: "prev".into(),
            block_creator: "node".into(),
            owner_address: "02aa".into(),
            data: BlockData::Entries(vec![entry]),
            nonce: 0,
            difficulty: 0,
            hash: "h".into(),
        };
        pool.prune(&block);
        assert!(pool.is_empty());
    }
}
