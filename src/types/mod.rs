//! Core data model: hashing, identities, entries, and blocks.

pub mod block;
pub mod entry;
pub mod hash;
pub mod identity;

pub use block::{Block, BlockData, CancelToken, MiningOutcome, DEFAULT_GENESIS_NOTE};
pub use entry::{Entry, EntryLocation, EntryValidationError, EntryView, TIMESTAMP_TOLERANCE_MS};
pub use hash::{has_leading_zero_nybbles, sha256_hex};
pub use identity::{CryptoError, Identity, SENTINEL_ICO, SENTINEL_INCENTIVE};
