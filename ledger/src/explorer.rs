//! Read-only chain scans shared by node balance queries and the
//! out-of-scope block-explorer reporting tool (§1, §6).
//!
//! Grounded on `examples/original_source/blockExplorer.go`:
//! these are the scanning formulas the explorer tool depends on from the
//! core, exposed here as library functions rather than a CLI.

use crate::storage::{BlockStore, StorageError};
use crate::types::tx::COINBASE_SENDER;

/// Scans the whole chain and returns `wallet`'s confirmed balance: the sum
/// of `amount` received minus the sum of `amount` sent, across every
/// transaction in every stored block.
///
/// Coinbase senders (`"coinbase"`) never debit a balance, since they are not
/// a real wallet.
pub fn confirmed_balance(store: &dyn BlockStore, wallet: &str) -> Result<f64, StorageError> {
    let mut balance = 0.0;
    let height = store.count()?;
    for index in 0..height {
        let block = store.load(index)?.ok_or(StorageError::NotFound(index))?;
        for tx in &block.body {
            if tx.to_address == wallet {
                balance += tx.amount;
            }
            if tx.from_address == wallet && tx.from_address != COINBASE_SENDER {
                balance -= tx.amount;
            }
        }
    }
    Ok(balance)
}

/// Every distinct wallet address that has appeared as a sender or receiver.
pub fn all_wallet_addresses(store: &dyn BlockStore) -> Result<Vec<String>, StorageError> {
    let mut addresses = Vec::new();
    let height = store.count()?;
    for index in 0..height {
        let block = store.load(index)?.ok_or(StorageError::NotFound(index))?;
        for tx in &block.body {
            if !addresses.contains(&tx.to_address) {
                addresses.push(tx.to_address.clone());
            }
            if tx.from_address != COINBASE_SENDER && !addresses.contains(&tx.from_address) {
                addresses.push(tx.from_address.clone());
            }
        }
    }
    Ok(addresses)
}

/// Number of blocks whose coinbase paid out to `miner_address`, i.e. how
/// many blocks that address has mined.
pub fn blocks_mined_by(store: &dyn BlockStore, miner_address: &str) -> Result<u64, StorageError> {
    let mut count = 0;
    let height = store.count()?;
    for index in 0..height {
        let block = store.load(index)?.ok_or(StorageError::NotFound(index))?;
        if block.coinbase().is_some_and(|cb| cb.to_address == miner_address) {
            count += 1;
        }
    }
    Ok(count)
}

/// Total coins minted by height `h` (inclusive): `10 * (h + 1)`, per the
/// fixed block subsidy invariant.
pub fn circulation_at_height(height: u64) -> f64 {
    crate::types::tx::COINBASE_AMOUNT * (height as f64 + 1.0)
}

/// Indices of blocks carrying at least one transaction with a non-empty
/// `public_key` — mirrors `blockExplorer.go`'s `containsPublicKey`.
pub fn blocks_with_public_key(store: &dyn BlockStore) -> Result<Vec<u64>, StorageError> {
    let mut indices = Vec::new();
    let height = store.count()?;
    for index in 0..height {
        let block = store.load(index)?.ok_or(StorageError::NotFound(index))?;
        if block.body.iter().any(|tx| !tx.public_key.is_empty()) {
            indices.push(index);
        }
    }
    Ok(indices)
}

/// For every stored block, its index paired with how many non-coinbase
/// transactions it carries (0 meaning coinbase-only) — mirrors
/// `blockExplorer.go`'s `containsTransactions`.
pub fn transaction_counts_by_block(store: &dyn BlockStore) -> Result<Vec<(u64, usize)>, StorageError> {
    let mut counts = Vec::new();
    let height = store.count()?;
    for index in 0..height {
        let block = store.load(index)?.ok_or(StorageError::NotFound(index))?;
        counts.push((index, block.body.len().saturating_sub(1)));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBlockStore;
    use crate::types::{Block, BlockHeader, Transaction};

    fn block_with(index: u64, body: Vec<Transaction>) -> Block {
        Block {
            hash: format!("hash{index}"),
            header: BlockHeader {
                version: 1,
                block_id: index.to_string(),
                prev_block_hash: "0".repeat(64),
                merkle_root: "a".repeat(64),
                timestamp: "t".to_string(),
                nonce: 0,
                target_bits: 2f64.powi(231),
            },
            body,
        }
    }

    #[test]
    fn confirmed_balance_sums_receipts_and_debits() {
        let store = InMemoryBlockStore::new();
        store
            .store_block(&block_with(0, vec![Transaction::coinbase("alice", "t0")]))
            .unwrap();
        store
            .store_block(&block_with(
                1,
                vec![
                    Transaction::coinbase("bob", "t1"),
                    Transaction {
                        amount: 3.0,
                        to_address: "bob".into(),
                        from_address: "alice".into(),
                        signature: String::new(),
                        public_key: String::new(),
                        timestamp: "t".into(),
                    },
                ],
            ))
            .unwrap();

        assert_eq!(confirmed_balance(&store, "alice").unwrap(), 7.0);
        assert_eq!(confirmed_balance(&store, "bob").unwrap(), 13.0);
    }

    #[test]
    fn all_wallet_addresses_deduplicates() {
        let store = InMemoryBlockStore::new();
        store
            .store_block(&block_with(0, vec![Transaction::coinbase("alice", "t0")]))
            .unwrap();
        store
            .store_block(&block_with(1, vec![Transaction::coinbase("alice", "t1")]))
            .unwrap();

        let addresses = all_wallet_addresses(&store).unwrap();
        assert_eq!(addresses, vec!["alice".to_string()]);
    }

    #[test]
    fn blocks_mined_by_counts_coinbase_recipient() {
        let store = InMemoryBlockStore::new();
        store
            .store_block(&block_with(0, vec![Transaction::coinbase("alice", "t0")]))
            .unwrap();
        store
            .store_block(&block_with(1, vec![Transaction::coinbase("bob", "t1")]))
            .unwrap();
        store
            .store_block(&block_with(2, vec![Transaction::coinbase("alice", "t2")]))
            .unwrap();

        assert_eq!(blocks_mined_by(&store, "alice").unwrap(), 2);
        assert_eq!(blocks_mined_by(&store, "bob").unwrap(), 1);
    }

    #[test]
    fn circulation_matches_fixed_subsidy_formula() {
        assert_eq!(circulation_at_height(0), 10.0);
        assert_eq!(circulation_at_height(2), 30.0);
    }

    #[test]
    fn blocks_with_public_key_finds_only_blocks_carrying_one() {
        let store = InMemoryBlockStore::new();
        store
            .store_block(&block_with(0, vec![Transaction::coinbase("alice", "t0")]))
            .unwrap();
        store
            .store_block(&block_with(
                1,
                vec![
                    Transaction::coinbase("bob", "t1"),
                    Transaction {
                        amount: 1.0,
                        to_address: "bob".into(),
                        from_address: "alice".into(),
                        signature: String::new(),
                        public_key: "-----BEGIN PUBLIC KEY-----".into(),
                        timestamp: "t".into(),
                    },
                ],
            ))
            .unwrap();

        assert_eq!(blocks_with_public_key(&store).unwrap(), vec![1]);
    }

    #[test]
    fn transaction_counts_by_block_distinguishes_coinbase_only() {
        let store = InMemoryBlockStore::new();
        store
            .store_block(&block_with(0, vec![Transaction::coinbase("alice", "t0")]))
            .unwrap();
        store
            .store_block(&block_with(
                1,
                vec![
                    Transaction::coinbase("bob", "t1"),
                    Transaction {
                        amount: 1.0,
                        to_address: "bob".into(),
                        from_address: "alice".into(),
                        signature: String::new(),
                        public_key: String::new(),
                        timestamp: "t".into(),
                    },
                ],
            ))
            .unwrap();

        assert_eq!(transaction_counts_by_block(&store).unwrap(), vec![(0, 0), (1, 1)]);
    }
}
