//! Hex encoding of transactions
//!
//! Transactions are exchanged as hex strings of their consensus
//! serialization. Segwit transactions are serialized with the marker and
//! flag bytes whenever any input carries a witness.

use crate::error::WalletError;
use bitcoin::consensus::encode::{deserialize, serialize};
use bitcoin::Transaction;

/// Consensus-serialize a transaction and hex-encode it (lower case)
pub fn encode_transaction_hex(tx: &Transaction) -> String {
    hex::encode(serialize(tx))
}

/// Decode a hex string into a transaction
///
/// Surrounding whitespace is ignored. Trailing bytes after the transaction
/// are rejected.
pub fn decode_transaction_hex(tx_hex: &str) -> Result<Transaction, WalletError> {
    let trimmed = tx_hex.trim();
    if trimmed.is_empty() {
        return Err(WalletError::Encoding("Empty transaction hex".to_string()));
    }

    let bytes = hex::decode(trimmed)?;
    let tx: Transaction = deserialize(&bytes)?;
    Ok(tx)
}
