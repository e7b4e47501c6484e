//! Chain algorithms: block construction, validation and fork choice.
//!
//! Everything here is pure and stateless; the shared chain lives in
//! [`crate::ledger::LedgerStore`].

use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::error::{ChainError, ValidationError};
use crate::model::{compute_block_hash, Block};

/// Format an instant the way block timestamps are stored.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, ChainError> {
    Ok(at.format(&Rfc3339)?)
}

/// Build a block extending `parent`, stamped with the current UTC time.
pub fn build_block(parent: &Block, value: i64) -> Result<Block, ChainError> {
    build_block_at(parent, value, OffsetDateTime::now_utc())
}

/// Build a block extending `parent`, stamped with `at`.
pub fn build_block_at(parent: &Block, value: i64, at: OffsetDateTime) -> Result<Block, ChainError> {
    let mut block = Block {
        index: parent.index + 1,
        timestamp: format_timestamp(at)?,
        value,
        hash: String::new(),
        prev_hash: parent.hash.clone(),
    };
    block.hash = compute_block_hash(&block);
    Ok(block)
}

/// Check `candidate` against exactly one declared `parent`.
///
/// Checks run in order: index contiguity, back-link, then self-hash.
pub fn validate_block(candidate: &Block, parent: &Block) -> Result<(), ValidationError> {
    let expected = parent.index + 1;
    if candidate.index != expected {
        return Err(ValidationError::NonContiguousIndex {
            expected,
            got: candidate.index,
        });
    }

    if candidate.prev_hash != parent.hash {
        return Err(ValidationError::PrevHashMismatch {
            expected: parent.hash.clone(),
            got: candidate.prev_hash.clone(),
        });
    }

    check_self_hash(candidate)
}

/// Boolean form of [`validate_block`].
pub fn is_valid(candidate: &Block, parent: &Block) -> bool {
    validate_block(candidate, parent).is_ok()
}

/// Genesis has no parent: index 0, empty back-link, and an intact self-hash.
pub fn validate_genesis(block: &Block) -> Result<(), ValidationError> {
    if block.index != 0 || !block.prev_hash.is_empty() {
        return Err(ValidationError::MalformedGenesis);
    }
    check_self_hash(block)
}

fn check_self_hash(block: &Block) -> Result<(), ValidationError> {
    let recomputed = compute_block_hash(block);
    if recomputed != block.hash {
        return Err(ValidationError::HashMismatch {
            stored: block.hash.clone(),
            recomputed,
        });
    }
    Ok(())
}

/// A fault found while auditing a whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFault {
    /// Position in the chain, `None` when the chain itself is empty.
    pub position: Option<usize>,
    pub reason: String,
}

impl std::fmt::Display for ChainFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(pos) => write!(f, "block {pos}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Walk an entire chain and report every fault; an empty result means intact.
pub fn validate_chain(chain: &[Block]) -> Vec<ChainFault> {
    let Some(first) = chain.first() else {
        return vec![ChainFault {
            position: None,
            reason: "chain is empty".into(),
        }];
    };

    let mut faults = vec![];
    if let Err(e) = validate_genesis(first) {
        faults.push(ChainFault {
            position: Some(0),
            reason: e.to_string(),
        });
    }

    for (i, pair) in chain.windows(2).enumerate() {
        if let Err(e) = validate_block(&pair[1], &pair[0]) {
            faults.push(ChainFault {
                position: Some(i + 1),
                reason: e.to_string(),
            });
        }
    }
    faults
}

/// Which side fork resolution picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkChoice {
    Candidate,
    Current,
}

/// Longest chain wins; ties keep the current chain.
pub fn choose_chain(candidate_len: usize, current_len: usize) -> ForkChoice {
    if candidate_len > current_len {
        ForkChoice::Candidate
    } else {
        ForkChoice::Current
    }
}

/// Return whichever of the two chains becomes canonical.
pub fn resolve(candidate: Vec<Block>, current: Vec<Block>) -> Vec<Block> {
    match choose_chain(candidate.len(), current.len()) {
        ForkChoice::Candidate => candidate,
        ForkChoice::Current => current,
    }
}
