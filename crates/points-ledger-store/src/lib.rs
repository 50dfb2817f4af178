//! Versioned storage layer for the points ledger.
//!
//! This crate provides storage for accounts, their audit trail and the global
//! plan limits. Every account record carries a version; writes name the
//! version they were computed from and fail with [`StoreError::Conflict`] if
//! another writer got there first. [`run_transaction`] turns that into a
//! serializable read-modify-write by retrying on conflict.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process, used by tests and single-node deployments.
//! - `RocksStore`: persistent, behind the `rocksdb-backend` feature.
//!
//! # Architecture
//!
//! The persistent backend uses the following column families:
//!
//! - `accounts`: Versioned account records, keyed by `user_id`
//! - `transactions`: Ledger transactions, keyed by `transaction_id` (ULID)
//! - `transactions_by_user`: Index for listing transactions by user
//! - `config`: Global configuration documents (plan limits)
//!
//! # Example
//!
//! ```
//! use points_ledger_core::{apply_deduct, DeductRequest, Limits, UserAccount, UserId};
//! use points_ledger_store::{run_transaction, MemoryStore, Store, DEFAULT_MAX_ATTEMPTS};
//!
//! let store = MemoryStore::new();
//! let mut account = UserAccount::new(UserId::generate());
//! account.balance = 100;
//! store.create_account_if_absent(&account, None).unwrap();
//!
//! let limits = Limits { max_daily: 2, cooldown_minutes: 0 };
//! let committed = run_transaction(&store, &account.id, DEFAULT_MAX_ATTEMPTS, |acct| {
//!     apply_deduct(acct, &DeductRequest::new(30, "demo"), limits, chrono::Utc::now()).map(Some)
//! })
//! .unwrap();
//!
//! assert_eq!(committed.account.balance, 70);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use points_ledger_core::{LedgerTransaction, PlanLimits, TransactionId, UserAccount, UserId};

/// Attempts made by [`run_transaction`] before reporting contention.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Monotonic per-record version. Starts at 1.
    pub version: u64,

    /// The record.
    pub value: T,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Get an account together with its current version.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_versioned(&self, user_id: &UserId) -> Result<Option<Versioned<UserAccount>>>;

    /// Get an account by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>> {
        Ok(self.get_versioned(user_id)?.map(|v| v.value))
    }

    /// Insert an account unless one already exists for the user.
    ///
    /// The optional transaction records an opening balance and is only written
    /// when the account is created. Returns the stored account and whether this
    /// call created it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn create_account_if_absent(
        &self,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<(UserAccount, bool)>;

    /// Replace an account and append its audit record in one atomic write.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `StoreError::AccountNotFound` if the account doesn't exist.
    /// - `StoreError::Conflict` if the stored version is not `expected_version`.
    fn commit(
        &self,
        expected_version: u64,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<u64>;

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<LedgerTransaction>>;

    /// List transactions for a user, ordered by time (newest first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerTransaction>>;

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Get the stored global plan limits, if any were ever written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_plan_limits(&self) -> Result<Option<PlanLimits>>;

    /// Replace the global plan limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_plan_limits(&self, limits: &PlanLimits) -> Result<()>;
}

/// The outcome of a committed [`run_transaction`].
#[derive(Debug, Clone)]
pub struct Committed {
    /// The account as written.
    pub account: UserAccount,

    /// The audit record written with it, if any.
    pub transaction: Option<LedgerTransaction>,

    /// The account's version after the write.
    pub version: u64,

    /// How many attempts it took.
    pub attempts: u32,
}

/// Run a read-modify-write against one account with serializable semantics.
///
/// `mutate` receives a fresh copy of the account on every attempt and returns
/// the audit record to write with it (or `None` for changes that do not touch
/// the balance). An error from `mutate` aborts without writing. When the
/// commit loses a race the whole closure runs again, up to `max_attempts`
/// times.
///
/// # Errors
///
/// - `StoreError::AccountNotFound` if the account doesn't exist.
/// - `StoreError::Contention` if every attempt conflicted.
/// - Any error returned by `mutate`.
pub fn run_transaction<S, E, F>(
    store: &S,
    user_id: &UserId,
    max_attempts: u32,
    mut mutate: F,
) -> std::result::Result<Committed, E>
where
    S: Store + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut UserAccount) -> std::result::Result<Option<LedgerTransaction>, E>,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let Versioned { version, value } =
            store
                .get_versioned(user_id)?
                .ok_or_else(|| StoreError::AccountNotFound {
                    user_id: user_id.to_string(),
                })?;

        let mut account = value;
        let transaction = mutate(&mut account)?;

        match store.commit(version, &account, transaction.as_ref()) {
            Ok(version) => {
                return Ok(Committed {
                    account,
                    transaction,
                    version,
                    attempts: attempt,
                });
            }
            Err(StoreError::Conflict) => {
                tracing::debug!(user_id = %user_id, attempt, "Write conflict, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::warn!(user_id = %user_id, attempts = max_attempts, "Transaction abandoned after repeated conflicts");
    Err(StoreError::Contention {
        attempts: max_attempts,
    }
    .into())
}
