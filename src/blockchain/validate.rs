//! Pure chain-validation helpers, independent of any running Blockchain
//! instance — used both by `validate_chain`'s query operation and by
//! `replace_chain` before a candidate chain is adopted.

use crate::consensus::Consensus;
use crate::types::{Block, TIMESTAMP_TOLERANCE_MS};

#[derive(Clone, Debug)]
pub struct ValidationIssue {
    pub error_type: String,
    pub block_number: u64,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct ChainValidationReport {
    pub is_valid: bool,
    pub block_count: usize,
    pub are_hashes_valid: bool,
    pub are_previous_hashes_valid: bool,
    pub are_indexes_valid: bool,
    pub are_timestamps_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// Independently re-checks every block at index ≥ 1 against previous-hash
/// linkage, index equality, hash self-consistency, and timestamp
/// tolerance.
pub fn validate_chain<C: Consensus>(chain: &[Block], consensus: &C) -> ChainValidationReport {
    let mut errors = Vec::new();
    let mut are_hashes_valid = true;
    let mut are_previous_hashes_valid = true;
    let mut are_indexes_valid = true;
    let mut are_timestamps_valid = true;

    for i in 1..chain.len() {
        let block = &chain[i];
        let previous = &chain[i - 1];

        if block.index != i as u64 {
            are_indexes_valid = false;
            errors.push(ValidationIssue {
                error_type: "index".to_string(),
                block_number: block.index,
                message: format!("expected index {i}, found {}", block.index),
            });
        }

        if block.previous_hash != previous.hash {
            are_previous_hashes_valid = false;
            errors.push(ValidationIssue {
                error_type: "previousHash".to_string(),
                block_number: block.index,
                message: "previousHash does not match predecessor's hash".to_string(),
            });
        }

        if !consensus.validate_block_consensus(block) {
            are_hashes_valid = false;
            errors.push(ValidationIssue {
                error_type: "hash".to_string(),
                block_number: block.index,
                message: "hash is not self-consistent or does not satisfy difficulty".to_string(),
            });
        }

        let drift = previous.timestamp as i64 - block.timestamp as i64;
        if drift >= TIMESTAMP_TOLERANCE_MS {
            are_timestamps_valid = false;
            errors.push(ValidationIssue {
                error_type: "timestamp".to_string(),
                block_number: block.index,
                message: "timestamp regressed more than the tolerance behind its predecessor"
                    .to_string(),
            });
        }
    }

    let is_valid =
        are_hashes_valid && are_previous_hashes_valid && are_indexes_valid && are_timestamps_valid;

    ChainValidationReport {
        is_valid,
        block_count: chain.len(),
        are_hashes_valid,
        are_previous_hashes_valid,
        are_indexes_valid,
        are_timestamps_valid,
        errors,
    }
}
