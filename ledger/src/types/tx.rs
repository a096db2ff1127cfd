// ledger/src/types/tx.rs

//! The transaction type: a signed value transfer or a coinbase reward.
//!
//! Field order here is part of the canonical-serialization contract (see
//! `crate::canonical`): changing it changes every hash and signature that
//! depends on a transaction's encoding.

use serde::{Deserialize, Serialize};

/// The literal `from_address` value used for block-subsidy transactions.
pub const COINBASE_SENDER: &str = "coinbase";

/// The fixed block subsidy minted by every coinbase transaction.
pub const COINBASE_AMOUNT: f64 = 10.0;

/// A signed transfer of value, or (when `from_address == "coinbase"`) the
/// block reward minted by a miner.
///
/// Two transactions are equal iff all fields are byte-equal (`PartialEq` is
/// derived field-by-field, which gives exactly that).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    pub to_address: String,
    pub from_address: String,
    pub signature: String,
    pub public_key: String,
    pub timestamp: String,
}

impl Transaction {
    /// Builds the coinbase transaction for a newly mined block.
    pub fn coinbase(miner_address: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Transaction {
            amount: COINBASE_AMOUNT,
            to_address: miner_address.into(),
            from_address: COINBASE_SENDER.to_string(),
            signature: String::new(),
            public_key: String::new(),
            timestamp: timestamp.into(),
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.from_address == COINBASE_SENDER
    }

    /// Returns a copy of this transaction with `signature` blanked, which is
    /// the form that gets canonically serialized and signed/verified.
    pub fn with_blank_signature(&self) -> Transaction {
        Transaction {
            signature: String::new(),
            ..self.clone()
        }
    }
}
