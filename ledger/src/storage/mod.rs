//! Block storage backends.
//!
//! A [`BlockStore`] holds one canonically-serialized block per height. All
//! methods take `&self`: implementations serialize concurrent access
//! internally (a `Mutex` for the in-memory store, the filesystem itself for
//! the file-backed one), matching how `node`/`miner` share one store across
//! the accept loop and the background sync/mining tasks.

pub mod file;
pub mod mem;

pub use file::FileBlockStore;
pub use mem::InMemoryBlockStore;

use std::fmt;

use crate::types::Block;

/// Errors a [`BlockStore`] implementation can return.
#[derive(Debug)]
pub enum StorageError {
    /// The requested height has no block and the caller treated that as an error
    /// (e.g. while walking the chain in [`crate::validation::is_valid`]).
    NotFound(u64),
    /// The stored bytes at a height were not valid canonical JSON for a block.
    Corrupt { index: u64, reason: String },
    /// The underlying filesystem operation failed.
    Io(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::NotFound(index) => write!(f, "no block stored at height {index}"),
            StorageError::Corrupt { index, reason } => {
                write!(f, "block at height {index} is corrupt: {reason}")
            }
            StorageError::Io(msg) => write!(f, "storage I/O error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Persists and retrieves blocks by height.
///
/// Heights are contiguous starting at 0: [`BlockStore::count`] is always the
/// height one past the highest stored block, and [`BlockStore::store`] is
/// expected to be called in height order (the node/miner code enforces this;
/// the trait itself does not).
pub trait BlockStore: Send + Sync {
    /// Loads the block at `index`, or `None` if nothing is stored there yet.
    fn load(&self, index: u64) -> Result<Option<Block>, StorageError>;

    /// Stores the canonical JSON encoding of a block at `index`, overwriting
    /// whatever was there before.
    fn store(&self, index: u64, canonical_json: &str) -> Result<(), StorageError>;

    /// The number of blocks currently stored (one past the highest height).
    fn count(&self) -> Result<u64, StorageError>;

    /// Convenience wrapper storing an already-parsed [`Block`] at its own
    /// [`Block::height`].
    fn store_block(&self, block: &Block) -> Result<(), StorageError> {
        self.store(block.height(), &crate::canonical::canonical_json(block))
    }
}
