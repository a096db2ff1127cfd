//! Shared state for the mining loop and the accept loop: the same
//! one-`Arc`-per-process shape `node`'s state uses, plus `preempt`, the
//! cooperative-cancellation flag `dispatch::handle_mined_block` sets when a
//! competing block lands mid-search (`examples/original_source/miner.go`'s
//! package-level `continueFlag`).

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ledger::{FileBlockStore, Mempool, MinerConfig};

pub struct MinerState {
    pub store: FileBlockStore,
    pub mempool: Mempool,
    pub config: MinerConfig,
    pub preempt: AtomicBool,
}

pub type SharedState = Arc<MinerState>;
