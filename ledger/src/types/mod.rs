//! Core domain types shared by the ledger, node, and miner.
//!
//! This module defines the wire/storage structs for transactions, blocks,
//! and the request/response packets exchanged between peers. All of them
//! derive `Serialize`/`Deserialize` from serde; field declaration order
//! matters, since it drives the canonical encoding in [`crate::canonical`].

pub mod block;
pub mod tx;

pub use block::{Block, BlockHeader};
pub use tx::Transaction;

use serde::{Deserialize, Serialize};

/// Sender role carried in a [`RequestHeader`].
pub const NODE_WALLET: &str = "wallet";
pub const NODE_NODE: &str = "node";
pub const NODE_MINER: &str = "miner";
pub const NODE_GENERIC: &str = "generic";

/// Dispatch kind carried in a [`RequestHeader`], naming one of the five
/// request kinds a node understands plus the sync handshake.
pub mod request {
    pub const TRANSACTION: &str = "Transaction";
    pub const BALANCE: &str = "Balance";
    pub const MINED_BLOCK: &str = "MinedBlock";
    pub const BLOCK_HEIGHT: &str = "BlockHeight";
    pub const SYNC_BLOCKCHAIN: &str = "SyncBlockchain";
    pub const PUBLIC_KEY_IN_CACHE: &str = "PublicKeyInCache";
}

/// Identifies the sender and the requested operation of a [`NetworkPacket`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    pub node: String,
    pub request: String,
}

impl RequestHeader {
    pub fn new(node: impl Into<String>, request: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            request: request.into(),
        }
    }
}

/// The single framed unit exchanged over the wire.
///
/// `body` is either empty or itself a canonically-serialized domain object
/// (a transaction, a block, a decimal balance, an address, `"true"`/`"false"`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPacket {
    pub header: RequestHeader,
    pub body: String,
}

impl NetworkPacket {
    pub fn new(header: RequestHeader, body: impl Into<String>) -> Self {
        Self {
            header,
            body: body.into(),
        }
    }
}

/// One entry of the per-node PGP public-key cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpCacheEntry {
    pub wallet_address: String,
    pub public_key_pem: String,
}
