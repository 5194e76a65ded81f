use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored chain is malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no chain is present in storage")]
    Empty,
}
