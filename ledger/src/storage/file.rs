//! File-per-block store: one file per height, named `block_<height>.blk`.
//!
//! Replaces the reference RocksDB-backed store with a simpler flat-file
//! layout. Each file holds exactly the block's canonical JSON encoding,
//! nothing else.

use std::fs;
use std::path::{Path, PathBuf};

use super::{BlockStore, StorageError};
use crate::types::Block;

const FILE_PREFIX: &str = "block_";
const FILE_SUFFIX: &str = ".blk";

fn block_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{index}{FILE_SUFFIX}"))
}

fn parse_index(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// A [`BlockStore`] backed by one file per block under a directory.
pub struct FileBlockStore {
    dir: PathBuf,
}

impl FileBlockStore {
    /// Opens (creating if necessary) a block store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self { dir })
    }
}

impl BlockStore for FileBlockStore {
    fn load(&self, index: u64) -> Result<Option<Block>, StorageError> {
        let path = block_path(&self.dir, index);
        match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::Corrupt { index, reason: e.to_string() }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e.to_string())),
        }
    }

    fn store(&self, index: u64, canonical_json: &str) -> Result<(), StorageError> {
        let path = block_path(&self.dir, index);
        fs::write(&path, canonical_json).map_err(|e| StorageError::Io(e.to_string()))
    }

    fn count(&self) -> Result<u64, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::Io(e.to_string()))?;
        let mut highest: Option<u64> = None;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::Io(e.to_string()))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(index) = parse_index(file_name) {
                highest = Some(highest.map_or(index, |h: u64| h.max(index)));
            }
        }
        Ok(highest.map_or(0, |h| h + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonical_json;
    use crate::types::{Block, BlockHeader, Transaction};
    use tempfile::tempdir;

    fn dummy_block(height: u64) -> Block {
        Block {
            hash: format!("hash{height}"),
            header: BlockHeader {
                version: 1,
                block_id: height.to_string(),
                prev_block_hash: "0".repeat(64),
                merkle_root: "a".repeat(64),
                timestamp: "t".to_string(),
                nonce: 0,
                target_bits: 2f64.powi(231),
            },
            body: vec![Transaction::coinbase("miner", "t")],
        }
    }

    #[test]
    fn store_then_load_roundtrips() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path()).unwrap();
        let block = dummy_block(0);
        store.store_block(&block).unwrap();

        let loaded = store.load(0).unwrap().expect("block present");
        assert_eq!(loaded, block);
    }

    #[test]
    fn count_tracks_highest_stored_height() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path()).unwrap();
        assert_eq!(store.count().unwrap(), 0);

        store.store(0, &canonical_json(&dummy_block(0))).unwrap();
        store.store(1, &canonical_json(&dummy_block(1))).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn load_missing_height_returns_none() {
        let dir = tempdir().unwrap();
        let store = FileBlockStore::open(dir.path()).unwrap();
        assert!(store.load(9).unwrap().is_none());
    }

    #[test]
    fn reopening_same_directory_sees_prior_blocks() {
        let dir = tempdir().unwrap();
        {
            let store = FileBlockStore::open(dir.path()).unwrap();
            store.store_block(&dummy_block(0)).unwrap();
        }
        let store = FileBlockStore::open(dir.path()).unwrap();
        assert!(store.load(0).unwrap().is_some());
        assert_eq!(store.count().unwrap(), 1);
    }
}
