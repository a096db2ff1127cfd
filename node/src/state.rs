//! Shared state handed to every connection handler: one `Arc` wrapping the
//! long-lived store and config plus a `tokio::sync::Mutex` around the PGP
//! cache, the one piece mutated from multiple tasks that also needs to
//! await a file write while held.

use std::sync::Arc;

use tokio::sync::Mutex;

use ledger::{FileBlockStore, Mempool, NodeConfig};

use crate::pgp_cache::PgpCache;

pub struct AppState {
    pub store: FileBlockStore,
    pub mempool: Mempool,
    pub pgp_cache: Mutex<PgpCache>,
    pub config: NodeConfig,
}

pub type SharedState = Arc<AppState>;
