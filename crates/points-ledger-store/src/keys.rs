//! Key encoding utilities for `RocksDB`.
//!
//! User IDs are variable length, so index keys separate the user ID from the
//! transaction ID with a `0x00` byte. User IDs never contain control
//! characters, which keeps one user's prefix from matching another's.

use points_ledger_core::{TransactionId, UserId};

const SEPARATOR: u8 = 0x00;
const TRANSACTION_ID_LEN: usize = 16;

/// Create an account key from a user ID.
#[must_use]
pub fn account_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a user-transaction index key.
///
/// Format: `user_id || 0x00 || transaction_id (16 bytes)`
///
/// Since ULIDs are time-ordered, transactions for a user will be sorted by time.
#[must_use]
pub fn user_transaction_key(user_id: &UserId, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = user_transactions_prefix(user_id);
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all transactions for a user.
#[must_use]
pub fn user_transactions_prefix(user_id: &UserId) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(user_id.as_bytes().len() + 1 + TRANSACTION_ID_LEN);
    prefix.extend_from_slice(user_id.as_bytes());
    prefix.push(SEPARATOR);
    prefix
}

/// Extract the transaction ID from a user-transaction index key.
///
/// Returns `None` if the key is shorter than a transaction ID.
#[must_use]
pub fn extract_transaction_id_from_user_key(key: &[u8]) -> Option<TransactionId> {
    let start = key.len().checked_sub(TRANSACTION_ID_LEN)?;
    let bytes: [u8; TRANSACTION_ID_LEN] = key[start..].try_into().ok()?;
    Some(TransactionId::from_bytes(bytes))
}
