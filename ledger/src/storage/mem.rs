//! In-memory block store, used by tests and by nothing else.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::types::Block;

use super::{BlockStore, StorageError};

/// Keeps every block's canonical JSON in a `HashMap` keyed by height.
#[derive(Default)]
pub struct InMemoryBlockStore {
    blocks: Mutex<HashMap<u64, String>>,
}

impl InMemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for InMemoryBlockStore {
    fn load(&self, index: u64) -> Result<Option<Block>, StorageError> {
        let blocks = self.blocks.lock().expect("in-memory store mutex poisoned");
        match blocks.get(&index) {
            Some(json) => serde_json::from_str(json)
                .map(Some)
                .map_err(|e| StorageError::Corrupt { index, reason: e.to_string() }),
            None => Ok(None),
        }
    }

    fn store(&self, index: u64, canonical_json: &str) -> Result<(), StorageError> {
        let mut blocks = self.blocks.lock().expect("in-memory store mutex poisoned");
        blocks.insert(index, canonical_json.to_string());
        Ok(())
    }

    fn count(&self) -> Result<u64, StorageError> {
        let blocks = self.blocks.lock().expect("in-memory store mutex poisoned");
        Ok(blocks.len() as u64)
    }
}
