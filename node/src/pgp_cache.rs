//! Per-node PGP public-key cache: persisted list of `(wallet_address, pem)`.
//!
//! Grounded on `examples/original_source/node.go`'s
//! `loadPGPCache`/`addToPgpCache`/`savePgpCacheFile` (§4.6).

use std::fs;
use std::path::Path;

use ledger::PgpCacheEntry;

/// First-appearance-wins cache of senders' public keys, letting later
/// transactions from the same address omit `public_key`.
pub struct PgpCache {
    entries: Vec<PgpCacheEntry>,
}

impl PgpCache {
    /// Loads the cache from `path`, or starts empty if the file doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self, String> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let entries: Vec<PgpCacheEntry> = serde_json::from_str(&contents)
                    .map_err(|e| format!("malformed pgp cache at {path:?}: {e}"))?;
                Ok(Self { entries })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self { entries: Vec::new() }),
            Err(e) => Err(format!("failed to read {path:?}: {e}")),
        }
    }

    /// Writes the whole cache back to `path` as one canonical JSON blob.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string(&self.entries).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn lookup(&self, wallet_address: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.wallet_address == wallet_address)
            .map(|e| e.public_key_pem.as_str())
    }

    /// Inserts `(wallet_address, public_key_pem)` if `wallet_address` isn't
    /// already cached. Returns whether an insertion happened.
    pub fn insert_if_absent(&mut self, wallet_address: &str, public_key_pem: &str) -> bool {
        if self.lookup(wallet_address).is_some() {
            return false;
        }
        self.entries.push(PgpCacheEntry {
            wallet_address: wallet_address.to_string(),
            public_key_pem: public_key_pem.to_string(),
        });
        true
    }
}
