//! In-memory chain storage, for tests and short-lived nodes.

use tokio::sync::Mutex;

use crate::types::Block;

use super::{Storage, StorageError};

/// Keeps the chain in a `Mutex<Vec<Block>>` instead of touching the
/// filesystem. Useful for unit tests and for nodes that don't need
/// durability across restarts.
#[derive(Default)]
pub struct InMemoryStorage {
    blocks: Mutex<Vec<Block>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage::default()
    }
}

impl Storage for InMemoryStorage {
    async fn append_block(&self, block: &Block) -> Result<(), StorageError> {
        self.blocks.lock().await.push(block.clone());
        Ok(())
    }

    async fn load_chain(&self) -> Result<Vec<Block>, StorageError> {
        let blocks = self.blocks.lock().await;
        if blocks.is_empty() {
            return Err(StorageError::Empty);
        }
        Ok(blocks.clone())
    }

    async fn rewrite_chain(&self, chain: &[Block]) -> Result<(), StorageError> {
        *self.blocks.lock().await = chain.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockData;

    fn block(index: u64) -> Block {
        Block {
            index,
            timestamp: 0,
            previous_hash: "prev".into(),
            block_creator: "node".into(),
            owner_address: "02aa".into(),
            data: BlockData::Entries(vec![]),
            nonce: 0,
            difficulty: 0,
            hash: format!("hash-{index}"),
        }
    }

    #[tokio::test]
    async fn load_fails_empty_then_succeeds_after_append() {
        let storage = InMemoryStorage::new();
        assert!(matches!(storage.load_chain().await, Err(StorageError::Empty)));

        storage.append_block(&block(0)).await.unwrap();
        let loaded = storage.load_chain().await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn rewrite_replaces_the_whole_chain() {
        let storage = InMemoryStorage::new();
        storage.append_block(&block(0)).await.unwrap();
        storage.append_block(&block(1)).await.unwrap();

        storage.rewrite_chain(&[block(0), block(1), block(2)]).await.unwrap();
        let loaded = storage.load_chain().await.unwrap();
        assert_eq!(loaded.len(), 3);
    }
}
