//! Candidate assembly and the proof-of-work search.
//!
//! Grounded on `examples/original_source/miner.go`'s
//! `mineBlocks`/`findHash`/`refilTransactionPool`. The nonce search is a
//! tight CPU loop, so it runs on a blocking thread (`spawn_blocking`) rather
//! than inline in the async mining task; `continueFlag` becomes
//! `MinerState::preempt`, an `AtomicBool` the accept loop flips when a
//! competing block lands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use ledger::canonical::{canonical_json, double_sha256_hex, sha256_hex};
use ledger::storage::{BlockStore, StorageError};
use ledger::validation::verify_block;
use ledger::wire::send_one_shot;
use ledger::{now_timestamp, request, Block, BlockHeader, Mempool, NetworkPacket, RequestHeader, Transaction, NODE_MINER};

use crate::state::MinerState;

/// Leading hex zeros a found hash must carry, matching `ledger::validation`.
const LEADING_ZEROS: &str = "000000";
/// Mempool transactions folded into a candidate body alongside the coinbase.
const MAX_TX_PER_BLOCK: usize = 10;
/// How long to wait before retrying when the store has no genesis yet.
const NO_GENESIS_RETRY: Duration = Duration::from_secs(5);

/// Runs forever: assemble a candidate, search for a winning nonce, then
/// either persist-and-broadcast a win or fold unused transactions back into
/// the mempool after a competitor's block preempted the search.
pub async fn mine_forever(state: SharedMinerState) {
    loop {
        let tip = match current_tip(&state.store) {
            Ok(Some(tip)) => tip,
            Ok(None) => {
                warn!("no genesis block present; mining paused");
                tokio::time::sleep(NO_GENESIS_RETRY).await;
                continue;
            }
            Err(e) => {
                warn!(error = %e, "failed to read chain tip, mining paused");
                tokio::time::sleep(NO_GENESIS_RETRY).await;
                continue;
            }
        };

        let coinbase = Transaction::coinbase(state.config.miner_address.clone(), now_timestamp());
        let mempool_txs = state.mempool.take_up_to(MAX_TX_PER_BLOCK);
        let mut body = Vec::with_capacity(1 + mempool_txs.len());
        body.push(coinbase);
        body.extend(mempool_txs.iter().cloned());

        let merkle_root = sha256_hex(&canonical_json(&body));
        let header = BlockHeader {
            version: 1,
            block_id: (tip.height() + 1).to_string(),
            prev_block_hash: tip.hash.clone(),
            merkle_root,
            timestamp: now_timestamp(),
            nonce: 0,
            target_bits: state.config.target_bits,
        };

        info!(
            height = tip.height() + 1,
            pool_remaining = state.mempool.len(),
            included = body.len(),
            "mining candidate block"
        );

        let mined = {
            let state_for_thread = Arc::clone(&state);
            tokio::task::spawn_blocking(move || {
                let mut header = header;
                search_nonce(&mut header, &state_for_thread.preempt).map(|hash| (hash, header))
            })
            .await
            .expect("mining thread panicked")
        };

        match mined {
            Some((hash, mined_header)) => {
                let block = Block {
                    hash,
                    header: mined_header,
                    body,
                };
                match verify_block(&block, &tip) {
                    Ok(()) => {
                        if let Err(e) = state.store.store_block(&block) {
                            warn!(error = %e, "failed to persist mined block");
                            continue;
                        }
                        state.mempool.prune_applied(&block.body);
                        info!(height = block.height(), hash = %block.hash, "mined block");
                        broadcast_mined_block(&state, &block).await;
                    }
                    Err(reason) => {
                        warn!(reason = %reason, "freshly mined block failed self-verification");
                    }
                }
            }
            None => {
                if let Err(e) = recover_from_preemption(&state.store, &state.mempool, &body) {
                    warn!(error = %e, "failed to reconcile mempool after preemption");
                }
            }
        }
    }
}

type SharedMinerState = Arc<MinerState>;

/// Searches nonces starting from `header.nonce`, mutating it in place, until
/// either a hash beats `header.target_bits` (returning it) or `preempt` is
/// observed set (returning `None`). Resets `preempt` to `false` on the way
/// out, mirroring `findHash`'s `continueFlag = true` reset.
fn search_nonce(header: &mut BlockHeader, preempt: &AtomicBool) -> Option<String> {
    loop {
        if preempt.swap(false, Ordering::SeqCst) {
            return None;
        }

        let hash = double_sha256_hex(&canonical_json(&*header));
        if hash.starts_with(LEADING_ZEROS) && ledger::hash_below_target(&hash, header.target_bits) {
            return Some(hash);
        }
        header.nonce += 1;
    }
}

fn current_tip(store: &dyn BlockStore) -> Result<Option<Block>, StorageError> {
    let count = store.count()?;
    if count == 0 {
        return Ok(None);
    }
    store.load(count - 1)
}

/// After a search is preempted, folds back whatever non-coinbase candidate
/// transactions did not make it into the block that won instead, preserving
/// their order at the head of the queue (`refilTransactionPool`).
fn recover_from_preemption(
    store: &dyn BlockStore,
    mempool: &Mempool,
    candidate_body: &[Transaction],
) -> Result<(), StorageError> {
    let count = store.count()?;
    if count == 0 {
        return Ok(());
    }
    let newest = store.load(count - 1)?.ok_or(StorageError::NotFound(count - 1))?;

    let unused: Vec<Transaction> = candidate_body
        .iter()
        .skip(1)
        .filter(|tx| !newest.body.contains(tx))
        .cloned()
        .collect();
    mempool.return_to_head(unused);
    Ok(())
}

async fn broadcast_mined_block(state: &MinerState, block: &Block) {
    let packet = NetworkPacket::new(
        RequestHeader::new(NODE_MINER, request::MINED_BLOCK),
        canonical_json(block),
    );
    for port in state.config.network.node_peers_excluding(state.config.bind_port) {
        let addr = format!("127.0.0.1:{port}");
        match send_one_shot(&addr, &packet).await {
            Ok(()) => info!(peer = %addr, "broadcast mined block"),
            Err(e) => warn!(peer = %addr, error = %e, "broadcast failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger::storage::InMemoryBlockStore;

    fn easy_header(nonce: u64) -> BlockHeader {
        BlockHeader {
            version: 1,
            block_id: "1".to_string(),
            prev_block_hash: "0".repeat(64),
            merkle_root: "a".repeat(64),
            timestamp: "t".to_string(),
            nonce,
            target_bits: 2f64.powi(231),
        }
    }

    #[test]
    fn search_nonce_finds_hash_meeting_target() {
        let mut header = easy_header(0);
        let preempt = AtomicBool::new(false);
        let hash = search_nonce(&mut header, &preempt).expect("should find a winning nonce");
        assert!(hash.starts_with(LEADING_ZEROS));
        assert!(ledger::hash_below_target(&hash, header.target_bits));
    }

    #[test]
    fn search_nonce_returns_none_when_preempted_and_resets_flag() {
        let mut header = easy_header(0);
        let preempt = AtomicBool::new(true);
        assert!(search_nonce(&mut header, &preempt).is_none());
        assert!(!preempt.load(Ordering::SeqCst));
    }

    #[test]
    fn recover_from_preemption_requeues_only_unused_transactions() {
        let store = InMemoryBlockStore::new();
        let winning_tx = Transaction {
            amount: 1.0,
            to_address: "a".into(),
            from_address: "b".into(),
            signature: "s".into(),
            public_key: "k".into(),
            timestamp: "t".into(),
        };
        let winning_block = Block {
            hash: "h".repeat(64),
            header: easy_header(0),
            body: vec![Transaction::coinbase("someone-else", "t0"), winning_tx.clone()],
        };
        store.store_block(&winning_block).unwrap();

        let unused_tx = Transaction {
            amount: 2.0,
            to_address: "c".into(),
            from_address: "d".into(),
            signature: "s2".into(),
            public_key: "k2".into(),
            timestamp: "t2".into(),
        };
        let candidate_body = vec![
            Transaction::coinbase("me", "t0"),
            winning_tx.clone(),
            unused_tx.clone(),
        ];

        let mempool = Mempool::new();
        recover_from_preemption(&store, &mempool, &candidate_body).unwrap();

        let requeued = mempool.take_up_to(10);
        assert_eq!(requeued, vec![unused_tx]);
    }
}
