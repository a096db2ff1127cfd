//! Inbound connection dispatch: the five request kinds plus the sync handshake.
//!
//! Grounded on `examples/original_source/node.go`'s
//! `handleConnection`/`handleTransaction`/`handleBalanceRequest`/
//! `handleBlockMined`/`handleBlockHeight`/`handlePublicKeyInCache` (§4.5).

use tokio::net::TcpStream;
use tracing::{info, warn};

use ledger::mempool::{spendable_balance, transaction_valid};
use ledger::validation::verify_block;
use ledger::wire::{send_one_shot, Connection};
use ledger::{canonical_json, request, Block, NetworkPacket, RequestHeader, Transaction, NODE_NODE};

use crate::state::SharedState;
use crate::sync_server;

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
        request::TRANSACTION => handle_transaction(&state, packet.body).await,
        request::BALANCE => handle_balance(&state, &mut conn, packet.body).await,
        request::MINED_BLOCK => handle_mined_block(&state, packet.body).await,
        request::BLOCK_HEIGHT => handle_block_height(&state, &mut conn).await,
        request::SYNC_BLOCKCHAIN => sync_server::handle_sync(&state, &mut conn, packet.body).await,
        request::PUBLIC_KEY_IN_CACHE => handle_public_key_in_cache(&state, &mut conn, packet.body).await,
        other => warn!(%peer, request = other, "unknown request kind"),
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

    let cached_key = {
        let cache = state.pgp_cache.lock().await;
        cache.lookup(&tx.from_address).map(str::to_string)
    };

    match transaction_valid(&tx, &state.store, &state.mempool, cached_key.as_deref()) {
        Ok(()) => {
            if !tx.public_key.is_empty() {
                let mut cache = state.pgp_cache.lock().await;
                if cache.insert_if_absent(&tx.from_address, &tx.public_key) {
                    if let Err(e) = cache.save(&state.config.pgp_cache_path) {
                        warn!(error = %e, "failed to persist pgp cache");
                    }
                }
            }
            state.mempool.push(tx.clone());
            info!(from = %tx.from_address, to = %tx.to_address, amount = tx.amount, "accepted transaction");
            broadcast_transaction(state, &tx).await;
        }
        Err(reason) => {
            warn!(from = %tx.from_address, to = %tx.to_address, reason = %reason, "rejected transaction");
        }
    }
}

async fn handle_mined_block(state: &SharedState, body: String) {
    let block: Block = match serde_json::from_str(&body) {
        Ok(block) => block,
        Err(e) => {
            warn!(error = %e, "malformed block body");
            return;
        }
    };

    let local_count = match state.store.count() {
        Ok(count) => count,
        Err(e) => {
            warn!(error = %e, "failed to read local height");
            return;
        }
    };
    let target_index = local_count;
    let tip = if local_count == 0 {
        None
    } else {
        match state.store.load(local_count - 1) {
            Ok(tip) => tip,
            Err(e) => {
                warn!(error = %e, "failed to load local tip");
                return;
            }
        }
    };
    let Some(tip) = tip else {
        warn!("no local tip to verify incoming block against");
        return;
    };

    match verify_block(&block, &tip) {
        Ok(()) => {
            if let Err(e) = state.store.store_block(&block) {
                warn!(index = target_index, error = %e, "failed to persist mined block");
                return;
            }
            state.mempool.prune_applied(&block.body);
            info!(index = target_index, "appended mined block");
            broadcast_block(state, &block).await;
        }
        Err(reason) => {
            warn!(index = target_index, reason = %reason, "rejected mined block");
        }
    }
}

async fn handle_balance(state: &SharedState, conn: &mut Connection, body: String) {
    let wallet = body.trim();
    match spendable_balance(&state.store, &state.mempool, wallet) {
        Ok(balance) => {
            let response = NetworkPacket::new(
                RequestHeader::new(NODE_NODE, request::BALANCE),
                balance.to_string(),
            );
            let _ = conn.write_packet(&response).await;
        }
        Err(e) => warn!(wallet, error = %e, "failed to compute balance"),
    }
}

async fn handle_block_height(state: &SharedState, conn: &mut Connection) {
    match state.store.count() {
        Ok(count) => {
            let height = count.saturating_sub(1);
            let response = NetworkPacket::new(
                RequestHeader::new(NODE_NODE, request::BLOCK_HEIGHT),
                height.to_string(),
            );
            let _ = conn.write_packet(&response).await;
        }
        Err(e) => warn!(error = %e, "failed to read local height"),
    }
}

async fn handle_public_key_in_cache(state: &SharedState, conn: &mut Connection, body: String) {
    let wallet = body.trim();
    let present = {
        let cache = state.pgp_cache.lock().await;
        cache.lookup(wallet).is_some()
    };
    let response = NetworkPacket::new(
        RequestHeader::new(NODE_NODE, request::PUBLIC_KEY_IN_CACHE),
        present.to_string(),
    );
    let _ = conn.write_packet(&response).await;
}

async fn broadcast_transaction(state: &SharedState, tx: &Transaction) {
    let packet = NetworkPacket::new(
        RequestHeader::new(NODE_NODE, request::TRANSACTION),
        canonical_json(tx),
    );
    broadcast(state, &packet).await;
}

async fn broadcast_block(state: &SharedState, block: &Block) {
    let packet = NetworkPacket::new(
        RequestHeader::new(NODE_NODE, request::MINED_BLOCK),
        canonical_json(block),
    );
    broadcast(state, &packet).await;
}

async fn broadcast(state: &SharedState, packet: &NetworkPacket) {
    for port in state.config.network.peers_excluding(state.config.bind_port) {
        let addr = format!("127.0.0.1:{port}");
        match send_one_shot(&addr, packet).await {
            Ok(()) => info!(peer = %addr, "broadcast delivered"),
            Err(e) => warn!(peer = %addr, error = %e, "broadcast failed"),
        }
    }
}
