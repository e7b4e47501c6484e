//! Data model for heartbeat blocks and the block hasher.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// 0-indexed position in the chain; genesis is 0.
    pub index: u64,
    /// RFC3339 timestamp string, captured when the block was built.
    pub timestamp: String,
    /// Submitted measurement (beats per minute).
    #[serde(rename = "bpm")]
    pub value: i64,
    /// SHA-256 hex over (index, timestamp, value, prevHash).
    pub hash: String,
    /// SHA-256 hex of the previous block (empty for genesis).
    #[serde(rename = "prevHash")]
    pub prev_hash: String,
}

impl Block {
    /// Build the genesis block for a chain started at `timestamp`.
    pub fn genesis(timestamp: String) -> Self {
        let mut block = Block {
            index: 0,
            timestamp,
            value: 0,
            hash: String::new(),
            prev_hash: String::new(),
        };
        block.hash = compute_block_hash(&block);
        block
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

/// Hash inputs (concatenate as bytes, SHA-256) and return lowercase hex.
pub fn hash_concat(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p);
    }
    hex::encode(hasher.finalize())
}

/// Compute a block hash from its header fields.
///
/// Integers are fixed-width little-endian and strings carry a u64 length
/// prefix, so no two distinct field tuples share an encoding. The stored
/// `hash` field itself is never an input.
pub fn compute_block_hash(b: &Block) -> String {
    hash_concat(&[
        &b.index.to_le_bytes(),
        &(b.timestamp.len() as u64).to_le_bytes(),
        b.timestamp.as_bytes(),
        &b.value.to_le_bytes(),
        &(b.prev_hash.len() as u64).to_le_bytes(),
        b.prev_hash.as_bytes(),
    ])
}
