//! Top-level error type aggregating the ledger's fallible subsystems.

use std::fmt;

use crate::storage::StorageError;
use crate::validation::{BlockInvalid, ChainInvalid};
use crate::wire::WireError;

/// Errors that can surface while driving the ledger from `node`/`miner`.
#[derive(Debug)]
pub enum Error {
    Storage(StorageError),
    Validation(ChainInvalid),
    Block(BlockInvalid),
    Wire(WireError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Storage(e) => write!(f, "{e}"),
            Error::Validation(e) => write!(f, "{e}"),
            Error::Block(e) => write!(f, "{e}"),
            Error::Wire(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

impl From<ChainInvalid> for Error {
    fn from(e: ChainInvalid) -> Self {
        Error::Validation(e)
    }
}

impl From<BlockInvalid> for Error {
    fn from(e: BlockInvalid) -> Self {
        Error::Block(e)
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Error::Wire(e)
    }
}
