//! Client-side blockchain sync: catching a lagging chain up to a peer's tip.
//!
//! Grounded on `examples/original_source/package/pocketcoin/blockchain/blockchain.go`'s
//! `GetHighestNodeBlockHeight`/`SyncNodeBlockchain` (§4.7). The server side
//! of the handshake lives in the `node` binary, which owns the listening
//! socket; this module only drives the client steps.

use std::fmt;

use crate::storage::{BlockStore, StorageError};
use crate::types::{request, NetworkPacket, RequestHeader, NODE_NODE};
use crate::validation::{verify_block, BlockInvalid};
use crate::wire::{send_request, Connection, WireError};

#[derive(Debug)]
pub enum SyncError {
    Wire(WireError),
    Storage(StorageError),
    /// The peer's first response line was not literally `"Okay"`.
    Rejected,
    /// A block line the peer sent could not be parsed.
    Parse(String),
    /// A block the peer sent failed local verification against the running tip.
    InvalidBlock { index: u64, reason: BlockInvalid },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Wire(e) => write!(f, "{e}"),
            SyncError::Storage(e) => write!(f, "{e}"),
            SyncError::Rejected => write!(f, "peer rejected the sync request"),
            SyncError::Parse(msg) => write!(f, "could not parse synced block: {msg}"),
            SyncError::InvalidBlock { index, reason } => {
                write!(f, "synced block {index} invalid: {reason}")
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl From<WireError> for SyncError {
    fn from(e: WireError) -> Self {
        SyncError::Wire(e)
    }
}

impl From<StorageError> for SyncError {
    fn from(e: StorageError) -> Self {
        SyncError::Storage(e)
    }
}

/// Asks `addr` for its current chain height.
pub async fn query_peer_height(addr: &str) -> Result<u64, WireError> {
    let packet = NetworkPacket::new(RequestHeader::new(NODE_NODE, request::BLOCK_HEIGHT), "");
    let response = send_request(addr, &packet).await?;
    response
        .body
        .trim()
        .parse()
        .map_err(|_| WireError::Parse(format!("non-numeric height body: {:?}", response.body)))
}

/// Queries every address in `peer_addrs` and returns the one reporting the
/// highest height, skipping unreachable peers. Ties keep the first peer
/// that reported the maximum.
pub async fn highest_peer_height(peer_addrs: &[String]) -> Option<(String, u64)> {
    let mut best: Option<(String, u64)> = None;
    for addr in peer_addrs {
        let Ok(height) = query_peer_height(addr).await else {
            continue;
        };
        let replace = match &best {
            None => true,
            Some((_, current)) => height > *current,
        };
        if replace {
            best = Some((addr.clone(), height));
        }
    }
    best
}

/// Pulls blocks `local_height+1 ..= peer_height` from `addr`, verifying and
/// persisting each one before acking it, and returns the new local height.
///
/// `store` must already hold a block at `local_height` to verify the first
/// synced block against.
pub async fn sync_from_peer(
    addr: &str,
    store: &dyn BlockStore,
    local_height: u64,
    peer_height: u64,
) -> Result<u64, SyncError> {
    let mut conn = Connection::connect(addr).await?;
    let packet = NetworkPacket::new(
        RequestHeader::new(NODE_NODE, request::SYNC_BLOCKCHAIN),
        local_height.to_string(),
    );
    conn.write_packet(&packet).await?;

    let ack = conn.read_line().await?;
    if ack != "Okay" {
        return Err(SyncError::Rejected);
    }

    let mut tip = store.load(local_height)?.ok_or(StorageError::NotFound(local_height))?;
    let iterations = peer_height.saturating_sub(local_height);
    for i in 0..iterations {
        let line = conn.read_line().await?;
        let block = serde_json::from_str(&line).map_err(|e| SyncError::Parse(e.to_string()))?;
        let index = local_height + i + 1;
        verify_block(&block, &tip).map_err(|reason| SyncError::InvalidBlock { index, reason })?;
        store.store(index, &line)?;
        tip = block;
        conn.write_line("Okay").await?;
    }
    Ok(local_height + iterations)
}
