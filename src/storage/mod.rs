//! Pluggable chain persistence.

pub mod error;
pub mod file;
pub mod mem;

pub use error::StorageError;
pub use file::FileStorage;
pub use mem::InMemoryStorage;

use crate::types::Block;

/// Persistence for the chain. `load_chain` failing (including an empty
/// backing store) is the genesis-creation signal for a fresh node, not
/// an error the orchestrator propagates further.
pub trait Storage: Send + Sync {
    /// Atomically appends one block to the backing store.
    fn append_block(
        &self,
        block: &Block,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Loads the full chain. Returns [`StorageError::Empty`] (or an I/O
    /// error) when nothing has been persisted yet.
    fn load_chain(&self) -> impl std::future::Future<Output = Result<Vec<Block>, StorageError>> + Send;

    /// Atomically replaces the entire backing store with `chain`, for
    /// peer-chain acceptance.
    fn rewrite_chain(
        &self,
        chain: &[Block],
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Pretty-printed JSON dump of the full chain, for operator inspection.
    fn export(&self, chain: &[Block]) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(chain)?)
    }
}
