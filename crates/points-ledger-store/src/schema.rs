//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Versioned account records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Ledger transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || 0x00 || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Global configuration documents, keyed by name.
    pub const CONFIG: &str = "config";
}

/// Key of the plan limits document in [`cf::CONFIG`].
pub const PLAN_LIMITS_KEY: &[u8] = b"plan_limits";

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::CONFIG,
    ]
}
