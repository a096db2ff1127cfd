//! Ledger library crate.
//!
//! Core building blocks shared by the `node` and `miner` binaries:
//!
//! - strongly-typed domain types (`types`),
//! - canonical serialization and hashing (`canonical`),
//! - wallet address derivation and signature crypto (`crypto`),
//! - the block verification / chain validity pipeline (`validation`),
//! - block storage backends (`storage`),
//! - read-only chain scans for balances and stats (`explorer`),
//! - the pending-transaction pool and its admission check (`mempool`),
//! - newline-framed packet transport (`wire`),
//! - the peer sync client (`sync`),
//! - process configuration (`config`),
//! - the aggregate error type (`error`).

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod error;
pub mod explorer;
pub mod mempool;
pub mod storage;
pub mod sync;
pub mod time;
pub mod types;
pub mod validation;
pub mod wire;

pub use canonical::{canonical_json, double_sha256_hex, hash_below_target, sha256_hex};
pub use config::{MinerConfig, NetworkConfig, NodeConfig};
pub use crypto::{wallet_address_from_pem, CryptoError};
pub use error::Error;
pub use mempool::{transaction_valid, Mempool, TxInvalid};
pub use storage::{BlockStore, FileBlockStore, InMemoryBlockStore, StorageError};
pub use time::now_timestamp;
pub use types::{
    request, Block, BlockHeader, NetworkPacket, PgpCacheEntry, RequestHeader, Transaction,
    NODE_GENERIC, NODE_MINER, NODE_NODE, NODE_WALLET,
};
pub use validation::{is_valid, verify_block, BlockInvalid, ChainInvalid};
