//! The pending-transaction pool, and the admission check that guards it.
//!
//! Grounded on `examples/original_source/node.go`'s
//! `transactionPool`/`updateTransactionPool`/`transactionValid`/
//! `transactionSignatureValid`/`getWalletBalanceWithPool`.

use std::fmt;
use std::sync::Mutex;

use crate::canonical::canonical_json;
use crate::crypto::{public_key_matches_address, verify_pkcs1v15_sha256};
use crate::explorer::confirmed_balance;
use crate::storage::{BlockStore, StorageError};
use crate::types::Transaction;

/// An ordered, append-only-except-for-pruning pool of pending transactions.
///
/// Transactions are deduplicated by full equality (§3's `Mempool`
/// definition), drained from the head by miners, and pruned from wherever
/// they sit once a block embedding them is applied.
#[derive(Default)]
pub struct Mempool {
    pending: Mutex<Vec<Transaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Transaction>> {
        self.pending.lock().expect("mempool mutex poisoned")
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, tx: &Transaction) -> bool {
        self.lock().contains(tx)
    }

    /// Appends `tx` to the tail of the pool.
    pub fn push(&self, tx: Transaction) {
        self.lock().push(tx);
    }

    /// Removes and returns up to `n` transactions from the head, in order.
    /// Used by the mining loop to assemble a candidate body.
    pub fn take_up_to(&self, n: usize) -> Vec<Transaction> {
        let mut pending = self.lock();
        let taken = pending.len().min(n);
        pending.drain(0..taken).collect()
    }

    /// Prepends `txs` back onto the head, preserving their original order.
    /// Used when a mining candidate is preempted and its unused mempool
    /// entries must go back to the front of the queue.
    pub fn return_to_head(&self, txs: Vec<Transaction>) {
        let mut pending = self.lock();
        for tx in txs.into_iter().rev() {
            pending.insert(0, tx);
        }
    }

    /// Removes, for each non-coinbase transaction in `body`, the first
    /// mempool entry equal to it, if any. Called after a block is applied.
    pub fn prune_applied(&self, body: &[Transaction]) {
        let mut pending = self.lock();
        for tx in body.iter().filter(|tx| !tx.is_coinbase()) {
            if let Some(pos) = pending.iter().position(|p| p == tx) {
                pending.remove(pos);
            }
        }
    }

    /// Sum of `amount` for every pending transaction sent by `wallet`: the
    /// outstanding debit not yet reflected on-chain.
    pub fn outstanding_debit(&self, wallet: &str) -> f64 {
        self.lock()
            .iter()
            .filter(|tx| tx.from_address == wallet)
            .map(|tx| tx.amount)
            .sum()
    }
}

/// `wallet`'s confirmed on-chain balance minus its outstanding mempool debits.
pub fn spendable_balance(
    store: &dyn BlockStore,
    mempool: &Mempool,
    wallet: &str,
) -> Result<f64, StorageError> {
    Ok(confirmed_balance(store, wallet)? - mempool.outstanding_debit(wallet))
}

/// Why [`transaction_valid`] rejected a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxInvalid {
    InsufficientBalance,
    SameSenderAndReceiver,
    AlreadyInMempool,
    MissingPublicKey,
    SignatureInvalid,
    AddressKeyMismatch,
}

impl fmt::Display for TxInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            TxInvalid::InsufficientBalance => "insufficient spendable balance",
            TxInvalid::SameSenderAndReceiver => "sender and receiver are the same address",
            TxInvalid::AlreadyInMempool => "transaction already in mempool",
            TxInvalid::MissingPublicKey => "no public key available for sender",
            TxInvalid::SignatureInvalid => "signature does not verify",
            TxInvalid::AddressKeyMismatch => "sender address does not match public key",
        };
        write!(f, "{reason}")
    }
}

impl std::error::Error for TxInvalid {}

/// Checks `tx` for mempool admission, in order.
///
/// `cached_key` is the sender's PGP-cached public key PEM, if the node has
/// one on file; it is used only when `tx.public_key` is empty.
pub fn transaction_valid(
    tx: &Transaction,
    store: &dyn BlockStore,
    mempool: &Mempool,
    cached_key: Option<&str>,
) -> Result<(), TxInvalid> {
    let spendable =
        spendable_balance(store, mempool, &tx.from_address).map_err(|_| TxInvalid::InsufficientBalance)?;
    if !(tx.amount > 0.0 && tx.amount <= spendable) {
        return Err(TxInvalid::InsufficientBalance);
    }

    if tx.from_address == tx.to_address {
        return Err(TxInvalid::SameSenderAndReceiver);
    }

    if mempool.contains(tx) {
        return Err(TxInvalid::AlreadyInMempool);
    }

    let public_key_pem = if !tx.public_key.is_empty() {
        tx.public_key.as_str()
    } else {
        cached_key.ok_or(TxInvalid::MissingPublicKey)?
    };

    let unsigned = tx.with_blank_signature();
    let message = canonical_json(&unsigned);
    if !verify_pkcs1v15_sha256(&message, &tx.signature, public_key_pem) {
        return Err(TxInvalid::SignatureInvalid);
    }

    if !public_key_matches_address(public_key_pem, &tx.from_address) {
        return Err(TxInvalid::AddressKeyMismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encode_public_key_pem, sign_pkcs1v15_sha256, wallet_address_from_pem};
    use crate::storage::InMemoryBlockStore;
    use crate::types::{Block, BlockHeader};
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;

    fn funded_store(wallet: &str, amount: f64) -> InMemoryBlockStore {
        let store = InMemoryBlockStore::new();
        let block = Block {
            hash: "genesis".to_string(),
            header: BlockHeader {
                version: 1,
                block_id: "0".to_string(),
                prev_block_hash: "0".repeat(64),
                merkle_root: "a".repeat(64),
                timestamp: "t".to_string(),
                nonce: 0,
                target_bits: 2f64.powi(231),
            },
            body: vec![Transaction::coinbase(wallet, "t0")],
        };
        store.store_block(&block).unwrap();
        store
    }

    /// Builds a transaction signed with `private_key`, embedding `public_key_pem`
    /// into the signed message itself (not just stapled on afterward): the
    /// signature covers every field except `signature`, `public_key` included,
    /// so a tx carrying a public key it wasn't signed with will never verify.
    fn signed_tx(
        private_key: &RsaPrivateKey,
        public_key_pem: &str,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Transaction {
        let unsigned = Transaction {
            amount,
            to_address: to.to_string(),
            from_address: from.to_string(),
            signature: String::new(),
            public_key: public_key_pem.to_string(),
            timestamp: "t1".to_string(),
        };
        let message = canonical_json(&unsigned);
        let signature = sign_pkcs1v15_sha256(&message, private_key).unwrap();
        Transaction {
            signature,
            ..unsigned
        }
    }

    #[test]
    fn take_up_to_drains_from_head_in_order() {
        let pool = Mempool::new();
        for i in 0..5 {
            pool.push(Transaction {
                amount: i as f64,
                to_address: "to".into(),
                from_address: "from".into(),
                signature: String::new(),
                public_key: String::new(),
                timestamp: i.to_string(),
            });
        }
        let taken = pool.take_up_to(3);
        assert_eq!(taken.len(), 3);
        assert_eq!(taken[0].amount, 0.0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn return_to_head_preserves_order() {
        let pool = Mempool::new();
        pool.push(Transaction {
            amount: 9.0,
            to_address: "to".into(),
            from_address: "from".into(),
            signature: String::new(),
            public_key: String::new(),
            timestamp: "later".into(),
        });
        let returned = vec![
            Transaction {
                amount: 1.0,
                to_address: "to".into(),
                from_address: "from".into(),
                signature: String::new(),
                public_key: String::new(),
                timestamp: "a".into(),
            },
            Transaction {
                amount: 2.0,
                to_address: "to".into(),
                from_address: "from".into(),
                signature: String::new(),
                public_key: String::new(),
                timestamp: "b".into(),
            },
        ];
        pool.return_to_head(returned);
        let drained = pool.take_up_to(10);
        assert_eq!(drained.iter().map(|t| t.amount).collect::<Vec<_>>(), vec![1.0, 2.0, 9.0]);
    }

    #[test]
    fn prune_applied_removes_matching_entries_only() {
        let pool = Mempool::new();
        let tx = Transaction {
            amount: 1.0,
            to_address: "to".into(),
            from_address: "from".into(),
            signature: String::new(),
            public_key: String::new(),
            timestamp: "a".into(),
        };
        pool.push(tx.clone());
        pool.push(Transaction {
            amount: 2.0,
            ..tx.clone()
        });
        pool.prune_applied(&[tx.clone()]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.take_up_to(1)[0].amount, 2.0);
    }

    #[test]
    fn transaction_valid_accepts_well_formed_signed_transfer() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);
        let pem = encode_public_key_pem(&public_key);
        let wallet = wallet_address_from_pem(&pem);

        let store = funded_store(&wallet, 10.0);
        let mempool = Mempool::new();
        let tx = signed_tx(&private_key, &pem, &wallet, "somebody-else", 4.0);

        assert!(transaction_valid(&tx, &store, &mempool, None).is_ok());
    }

    #[test]
    fn transaction_valid_rejects_overspend() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);
        let pem = encode_public_key_pem(&public_key);
        let wallet = wallet_address_from_pem(&pem);

        let store = funded_store(&wallet, 10.0);
        let mempool = Mempool::new();
        let tx = signed_tx(&private_key, &pem, &wallet, "somebody-else", 999.0);

        assert_eq!(
            transaction_valid(&tx, &store, &mempool, None).unwrap_err(),
            TxInvalid::InsufficientBalance
        );
    }

    #[test]
    fn transaction_valid_uses_cached_key_when_public_key_omitted() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);
        let pem = encode_public_key_pem(&public_key);
        let wallet = wallet_address_from_pem(&pem);

        let store = funded_store(&wallet, 10.0);
        let mempool = Mempool::new();
        let tx = signed_tx(&private_key, "", &wallet, "somebody-else", 4.0);
        assert!(tx.public_key.is_empty());

        assert!(transaction_valid(&tx, &store, &mempool, Some(&pem)).is_ok());
        assert_eq!(
            transaction_valid(&tx, &store, &mempool, None).unwrap_err(),
            TxInvalid::MissingPublicKey
        );
    }

    #[test]
    fn transaction_valid_rejects_tampered_signature() {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public_key = rsa::RsaPublicKey::from(&private_key);
        let pem = encode_public_key_pem(&public_key);
        let wallet = wallet_address_from_pem(&pem);

        let store = funded_store(&wallet, 10.0);
        let mempool = Mempool::new();
        let mut tx = signed_tx(&private_key, &pem, &wallet, "somebody-else", 4.0);
        tx.amount = 5.0;

        assert_eq!(
            transaction_valid(&tx, &store, &mempool, None).unwrap_err(),
            TxInvalid::SignatureInvalid
        );
    }
}
