// node/src/main.rs

//! Node binary: the gossiping, validating half of the network.
//!
//! Owns the persisted chain, the mempool, and the PGP cache; dispatches
//! inbound packets by request kind (§4.5) and serves the sync protocol
//! (§4.7) to lagging peers.

mod dispatch;
mod pgp_cache;
mod state;
mod sync_server;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use ledger::sync::{highest_peer_height, sync_from_peer};
use ledger::{is_valid, FileBlockStore, Mempool, NodeConfig};
use pgp_cache::PgpCache;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "node=info,ledger=info".to_string()))
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = NodeConfig::default();

    let store = FileBlockStore::open(config.storage_dir.clone())
        .map_err(|e| format!("failed to open block store at {:?}: {e}", config.storage_dir))?;

    if let Err(e) = is_valid(&store) {
        return Err(format!("local chain failed validation: {e}"));
    }

    let pgp_cache = PgpCache::load(&config.pgp_cache_path)
        .map_err(|e| format!("failed to load pgp cache at {:?}: {e}", config.pgp_cache_path))?;

    let state: Arc<AppState> = Arc::new(AppState {
        store,
        mempool: Mempool::new(),
        pgp_cache: tokio::sync::Mutex::new(pgp_cache),
        config: config.clone(),
    });

    sync_on_startup(&state).await;

    let bind_addr = format!("127.0.0.1:{}", config.bind_port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("failed to bind {bind_addr}: {e}"))?;
    tracing::info!(addr = %bind_addr, "node listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            dispatch::handle_connection(stream, state).await;
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

/// Polls configured peers for a higher tip and, if one is found, pulls the
/// missing blocks before the accept loop starts serving.
async fn sync_on_startup(state: &Arc<AppState>) {
    let local_count = match state.store.count() {
        Ok(count) => count,
        Err(e) => {
            tracing::error!(error = %e, "failed to read local height");
            return;
        }
    };
    if local_count == 0 {
        tracing::warn!("no genesis block present; skipping startup sync");
        return;
    }
    let local_height = local_count - 1;

    let peer_addrs: Vec<String> = state
        .config
        .network
        .node_peers_excluding(state.config.bind_port)
        .into_iter()
        .map(|port| format!("127.0.0.1:{port}"))
        .collect();

    let Some((peer_addr, peer_height)) = highest_peer_height(&peer_addrs).await else {
        tracing::info!("no reachable peers at startup; continuing at local height");
        return;
    };

    if peer_height == 0 || peer_height <= local_height {
        tracing::info!(local_height, peer_height, "local chain already caught up");
        return;
    }

    match sync_from_peer(&peer_addr, &state.store, local_height, peer_height).await {
        Ok(new_height) => tracing::info!(new_height, peer = %peer_addr, "synced from peer"),
        Err(e) => tracing::warn!(error = %e, peer = %peer_addr, "startup sync failed"),
    }
}
