// ledger/src/types/block.rs

//! Block header and block types.
//!
//! Field order in [`BlockHeader`] is part of the canonical-serialization
//! contract: the block hash is the double-SHA-256 of this struct's
//! canonical JSON, so reordering fields changes every hash in the chain.

use serde::{Deserialize, Serialize};

use super::Transaction;

/// Chain-linking and proof-of-work metadata for a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub block_id: String,
    pub prev_block_hash: String,
    pub merkle_root: String,
    pub timestamp: String,
    pub nonce: u64,
    pub target_bits: f64,
}

/// A mined block: a hash, its header, and an ordered transaction body whose
/// first element is always the coinbase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub header: BlockHeader,
    pub body: Vec<Transaction>,
}

impl Block {
    /// The block height, parsed from `header.block_id`.
    ///
    /// `block_id` is carried as a decimal string (matching the wire
    /// encoding used throughout the protocol); this parses it back to a
    /// number for local bookkeeping. Panics on a malformed header, which
    /// should never happen for a block this process produced or accepted.
    pub fn height(&self) -> u64 {
        self.header
            .block_id
            .parse()
            .expect("block_id must be a decimal height")
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.body.first()
    }
}
