// miner/src/main.rs

//! Miner binary: assembles candidate blocks, searches for a winning nonce,
//! and reports wins to nodes — while also accepting inbound transactions and
//! competing blocks from the network between searches.

mod dispatch;
mod mining;
mod state;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use ledger::sync::{highest_peer_height, sync_from_peer};
use ledger::{is_valid, FileBlockStore, Mempool, MinerConfig};
use state::MinerState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "miner=info,ledger=info".to_string()))
        .init();

    if let Err(e) = run().await {
        tracing::error!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = parse_args()?;

    let store = FileBlockStore::open(config.storage_dir.clone())
        .map_err(|e| format!("failed to open block store at {:?}: {e}", config.storage_dir))?;

    if let Err(e) = is_valid(&store) {
        return Err(format!("local chain failed validation: {e}"));
    }

    let state: Arc<MinerState> = Arc::new(MinerState {
        store,
        mempool: Mempool::new(),
        config: config.clone(),
        preempt: AtomicBool::new(false),
    });

    sync_on_startup(&state).await;

    tokio::spawn(mining::mine_forever(state.clone()));

    let bind_addr = format!("127.0.0.1:{}", config.bind_port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| format!("failed to bind {bind_addr}: {e}"))?;
    tracing::info!(addr = %bind_addr, wallet = %config.miner_address, "miner listening");

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

/// Minimal flag parsing mirroring `miner.go`'s `-p`/`-w`/`-f` flags: no CLI
/// crate is pulled in for three flat key-value flags.
fn parse_args() -> Result<MinerConfig, String> {
    let mut config = MinerConfig::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-w" | "--wallet" => {
                config.miner_address = args.next().ok_or_else(|| "missing value for -w".to_string())?;
            }
            "-p" | "--port" => {
                let value = args.next().ok_or_else(|| "missing value for -p".to_string())?;
                config.bind_port = value.parse().map_err(|_| format!("invalid port: {value}"))?;
            }
            "-f" | "--storage-dir" => {
                let value = args.next().ok_or_else(|| "missing value for -f".to_string())?;
                config.storage_dir = PathBuf::from(value);
            }
            other => return Err(format!("unrecognized argument: {other}")),
        }
    }

    if config.miner_address.is_empty() {
        return Err("missing required argument: -w <miner wallet address>".to_string());
    }
    Ok(config)
}

/// Polls configured node peers for a higher tip and, if one is found, pulls
/// the missing blocks before mining and the accept loop start.
async fn sync_on_startup(state: &Arc<MinerState>) {
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
