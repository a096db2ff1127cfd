//! Inbound connection dispatch while mining.
//!
//! Grounded on `examples/original_source/miner.go`'s
//! `handleConnection`/`handleNewMinedBlock`/`handleNewTransaction`: a miner
//! only reacts to two request kinds, and — unlike a node — takes an
//! incoming transaction on trust (no signature/balance recheck), since by
//! the time a transaction reaches a miner a node has already admitted it.
//! `BlockHeight`/`SyncBlockchain`/`Balance`/`PublicKeyInCache` are a node's
//! job; a miner that receives one just logs and drops the connection.

use std::sync::atomic::Ordering;

use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use ledger::validation::verify_block;
use ledger::wire::Connection;
use ledger::{request, Block, Transaction};

use crate::state::SharedState;

pub async fn handle_connection(stream: TcpStream, state: SharedState) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let mut conn = Connection::from_stream(stream);

    let packet = match conn.read_packet().await {
        Ok(packet) => packet,
        Err(e) => {
            warn!(%peer, error = %e, "failed to read inbound packet");
            return;
        }
    };

    match packet.header.request.as_str() {
        request::MINED_BLOCK => handle_mined_block(&state, packet.body).await,
        request::TRANSACTION => handle_transaction(&state, packet.body).await,
        other => debug!(%peer, request = other, "miner ignores this request kind"),
    }
}

async fn handle_mined_block(state: &SharedState, body: String) {
    let incoming: Block = match serde_json::from_str(&body) {
        Ok(block) => block,
        Err(e) => {
            warn!(error = %e, "malformed block body");
            return;
        }
    };

    let count = match state.store.count() {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "failed to read local height");
            return;
        }
    };
    if count == 0 {
        warn!("no local tip to verify incoming block against");
        return;
    }
    let tip = match state.store.load(count - 1) {
        Ok(Some(tip)) => tip,
        Ok(None) => {
            warn!("no local tip to verify incoming block against");
            return;
        }
        Err(e) => {
            warn!(error = %e, "failed to load local tip");
            return;
        }
    };

    match verify_block(&incoming, &tip) {
        Ok(()) => {
            // Stop the in-flight nonce search before a duplicate block gets mined.
            state.preempt.store(true, Ordering::SeqCst);

            if let Err(e) = state.store.store_block(&incoming) {
                warn!(error = %e, "failed to persist incoming block");
                return;
            }
            state.mempool.prune_applied(&incoming.body);
            info!(height = count, "accepted competing block");
        }
        Err(reason) => {
            warn!(reason = %reason, "rejected incoming block");
        }
    }
}

async fn handle_transaction(state: &SharedState, body: String) {
    let tx: Transaction = match serde_json::from_str(&body) {
        Ok(tx) => tx,
        Err(e) => {
            warn!(error = %e, "malformed transaction body");
            return;
        }
    };

    if state.mempool.contains(&tx) {
        return;
    }
    state.mempool.push(tx);
}
