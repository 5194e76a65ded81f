//! File-backed chain storage.
//!
//! Each block is written as its canonical JSON serialization followed by
//! the two-byte separator `",\n"`. Loading reads the whole file, splits
//! on that separator, drops empty trailing segments, and parses each
//! chunk as a block.

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::types::Block;

use super::{Storage, StorageError};

const SEPARATOR: &str = ",\n";

pub struct FileStorage {
    path: std::path::PathBuf,
    // Serializes append/rewrite so two concurrent writers can't interleave
    // partial writes into the stream.
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        FileStorage {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn parse_stream(contents: &str) -> Result<Vec<Block>, StorageError> {
        contents
            .split(SEPARATOR)
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| serde_json::from_str(chunk).map_err(StorageError::from))
            .collect()
    }
}

impl Storage for FileStorage {
    async fn append_block(&self, block: &Block) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let mut chunk = serde_json::to_string(block)?;
        chunk.push_str(SEPARATOR);
        file.write_all(chunk.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn load_chain(&self) -> Result<Vec<Block>, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(StorageError::Empty),
            Err(err) => return Err(StorageError::Io(err)),
        };
        let blocks = Self::parse_stream(&contents)?;
        if blocks.is_empty() {
            return Err(StorageError::Empty);
        }
        Ok(blocks)
    }

    async fn rewrite_chain(&self, chain: &[Block]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut contents = String::new();
        for block in chain {
            contents.push_str(&serde_json::to_string(block)?);
            contents.push_str(SEPARATOR);
        }
        fs::write(&self.path, contents).await?;
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
            timestamp: 1_700_000_000_000 + index,
            previous_hash: format!("hash-{}", index.saturating_sub(1)),
            block_creator: "node".into(),
            owner_address: "02aa".into(),
            data: BlockData::Entries(vec![]),
            nonce: 0,
            difficulty: 0,
            hash: format!("hash-{index}"),
        }
    }

    #[tokio::test]
    async fn load_fails_when_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("chain.txt"));
        assert!(matches!(storage.load_chain().await, Err(StorageError::Empty)));
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("chain.txt"));
        storage.append_block(&block(0)).await.unwrap();
        storage.append_block(&block(1)).await.unwrap();

        let loaded = storage.load_chain().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].index, 1);
    }

    #[tokio::test]
    async fn rewrite_overwrites_prior_contents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("chain.txt"));
        storage.append_block(&block(0)).await.unwrap();
        storage.rewrite_chain(&[block(0), block(1), block(2)]).await.unwrap();

        let loaded = storage.load_chain().await.unwrap();
        assert_eq!(loaded.len(), 3);
    }
}
