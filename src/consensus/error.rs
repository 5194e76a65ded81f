use thiserror::Error;

/// Failure producing or validating a block under a [`Consensus`](super::Consensus) rule set.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("block index {got} does not follow tip index {expected_prev}")]
    NonSequentialIndex { expected_prev: u64, got: u64 },
    #[error("block previousHash does not match the tip hash")]
    PreviousHashMismatch,
    #[error("block hash does not match its recomputed hash")]
    HashMismatch,
    #[error("block hash does not satisfy its declared difficulty prefix")]
    DifficultyNotSatisfied,
    #[error("block timestamp is more than {tolerance_ms}ms behind its predecessor")]
    TimestampRegression { tolerance_ms: i64 },
}
