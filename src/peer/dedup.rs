//! Gossip dedup: a time-indexed set tracking recently seen message
//! ids for a 30-second window. A min-heap of `(expiry, id)` is drained
//! lazily on each lookup instead of scheduling one timer per message.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

/// How long a `messageId` is remembered for dedup purposes.
pub const DEDUP_WINDOW_MS: u64 = 30_000;

pub struct DedupSet {
    seen: HashSet<String>,
    expirations: BinaryHeap<Reverse<(u64, String)>>,
}

impl DedupSet {
    pub fn new() -> Self {
        DedupSet {
            seen: HashSet::new(),
            expirations: BinaryHeap::new(),
        }
    }

    fn evict_expired(&mut self, now_ms: u64) {
        while let Some(Reverse((expiry, _))) = self.expirations.peek() {
            if *expiry > now_ms {
                break;
            }
            let Reverse((_, id)) = self.expirations.pop().expect("just peeked");
            self.seen.remove(&id);
        }
    }

    /// Returns `true` if `id` has been seen within the dedup window
    /// (and is therefore a duplicate to drop), recording it as seen
    /// either way.
    pub fn seen_or_record(&mut self, id: &str, now_ms: u64) -> bool {
        self.evict_expired(now_ms);
        if self.seen.contains(id) {
            return true;
        }
        self.seen.insert(id.to_string());
        self.expirations
            .push(Reverse((now_ms + DEDUP_WINDOW_MS, id.to_string())));
        false
    }
}

impl Default for DedupSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sighting_is_not_a_duplicate() {
        let mut set = DedupSet::new();
        assert!(!set.seen_or_record("m1", 0));
    }

    #[test]
    fn repeat_sighting_within_window_is_a_duplicate() {
        let mut set = DedupSet::new();
        set.seen_or_record("m1", 0);
        assert!(set.seen_or_record("m1", 1_000));
    }

    #[test]
    fn sighting_after_window_expires_is_fresh_again() {
        let mut set = DedupSet::new();
        set.seen_or_record("m1", 0);
        assert!(!set.seen_or_record("m1", DEDUP_WINDOW_MS + 1));
    }
}
