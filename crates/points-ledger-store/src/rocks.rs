//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Commits run inside an optimistic transaction: the account key is read with
//! `get_for_update`, so a concurrent commit to the same account makes ours
//! fail with `Busy` at commit time, which surfaces as `StoreError::Conflict`.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode, MultiThreaded,
    OptimisticTransactionDB, Options, Transaction,
};
use serde::{Deserialize, Serialize};

use points_ledger_core::{LedgerTransaction, PlanLimits, TransactionId, UserAccount, UserId};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf, PLAN_LIMITS_KEY};
use crate::{Store, Versioned, DEFAULT_MAX_ATTEMPTS};

type Db = OptimisticTransactionDB<MultiThreaded>;

/// On-disk account record.
#[derive(Serialize, Deserialize)]
struct StoredAccount {
    version: u64,
    account: UserAccount,
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, path, cf_descriptors).map_err(db_error)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Stage a ledger transaction and its index entry.
    fn stage_transaction(
        &self,
        txn: &Transaction<'_, Db>,
        transaction: &LedgerTransaction,
    ) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;

        let tx_key = keys::transaction_key(&transaction.id);
        let user_tx_key = keys::user_transaction_key(&transaction.user_id, &transaction.id);
        let value = Self::serialize(transaction)?;

        txn.put_cf(&cf_tx, tx_key, value).map_err(db_error)?;
        txn.put_cf(&cf_by_user, user_tx_key, b"").map_err(db_error)?; // Index entry (empty value)
        Ok(())
    }

    fn try_create(
        &self,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<(UserAccount, bool)> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.id);

        let txn = self.db.transaction();
        if let Some(data) = txn
            .get_for_update_cf(&cf_accounts, &key, true)
            .map_err(db_error)?
        {
            let stored: StoredAccount = Self::deserialize(&data)?;
            return Ok((stored.account, false));
        }

        let value = Self::serialize(&StoredAccount {
            version: 1,
            account: account.clone(),
        })?;
        txn.put_cf(&cf_accounts, &key, value).map_err(db_error)?;
        if let Some(tx) = transaction {
            self.stage_transaction(&txn, tx)?;
        }
        txn.commit().map_err(commit_error)?;

        Ok((account.clone(), true))
    }
}

fn db_error(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn commit_error(e: rocksdb::Error) -> StoreError {
    match e.kind() {
        ErrorKind::Busy | ErrorKind::TryAgain => StoreError::Conflict,
        _ => db_error(e),
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn get_versioned(&self, user_id: &UserId) -> Result<Option<Versioned<UserAccount>>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        Ok(self
            .db
            .get_cf(&cf, key)
            .map_err(db_error)?
            .map(|data| Self::deserialize::<StoredAccount>(&data))
            .transpose()?
            .map(|stored| Versioned {
                version: stored.version,
                value: stored.account,
            }))
    }

    fn create_account_if_absent(
        &self,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<(UserAccount, bool)> {
        // Two racing creates: the loser re-reads and finds the winner's record.
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            match self.try_create(account, transaction) {
                Err(StoreError::Conflict) => continue,
                result => return result,
            }
        }
        Err(StoreError::Contention {
            attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    fn commit(
        &self,
        expected_version: u64,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<u64> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.id);

        let txn = self.db.transaction();
        let current: StoredAccount = txn
            .get_for_update_cf(&cf_accounts, &key, true)
            .map_err(db_error)?
            .map(|data| Self::deserialize(&data))
            .transpose()?
            .ok_or_else(|| StoreError::AccountNotFound {
                user_id: account.id.to_string(),
            })?;

        if current.version != expected_version {
            return Err(StoreError::Conflict);
        }

        let version = current.version + 1;
        let value = Self::serialize(&StoredAccount {
            version,
            account: account.clone(),
        })?;
        txn.put_cf(&cf_accounts, &key, value).map_err(db_error)?;
        if let Some(tx) = transaction {
            self.stage_transaction(&txn, tx)?;
        }
        txn.commit().map_err(commit_error)?;

        Ok(version)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<LedgerTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(db_error)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // Every index key for the user sorts below `user_id || 0x01`, so a
        // reverse scan from there yields newest first.
        let mut upper = prefix.clone();
        if let Some(last) = upper.last_mut() {
            *last += 1;
        }

        let iter = self
            .db
            .iterator_cf(&cf_by_user, IteratorMode::From(&upper, Direction::Reverse));

        let mut transactions = Vec::new();
        let mut skipped = 0;

        for item in iter {
            let (key, _) = item.map_err(db_error)?;

            if !key.starts_with(&prefix) {
                break;
            }

            if skipped < offset {
                skipped += 1;
                continue;
            }

            if transactions.len() >= limit {
                break;
            }

            let Some(tx_id) = keys::extract_transaction_id_from_user_key(&key) else {
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    fn get_plan_limits(&self) -> Result<Option<PlanLimits>> {
        let cf = self.cf(cf::CONFIG)?;

        self.db
            .get_cf(&cf, PLAN_LIMITS_KEY)
            .map_err(db_error)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn put_plan_limits(&self, limits: &PlanLimits) -> Result<()> {
        let cf = self.cf(cf::CONFIG)?;
        let value = Self::serialize(limits)?;

        self.db
            .put_cf(&cf, PLAN_LIMITS_KEY, value)
            .map_err(db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use points_ledger_core::{apply_deduct, DeductRequest, LedgerError, LimitEntry, Limits};
    use tempfile::TempDir;

    use crate::run_transaction;

    fn create_test_store() -> (RocksStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = RocksStore::open(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn seeded(store: &RocksStore, balance: i64) -> UserId {
        let mut account = UserAccount::new(UserId::generate());
        account.balance = balance;
        store.create_account_if_absent(&account, None).unwrap();
        account.id
    }

    #[test]
    fn account_roundtrip() {
        let (store, _dir) = create_test_store();
        let user_id = seeded(&store, 42);

        let stored = store.get_versioned(&user_id).unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.value.balance, 42);
        assert!(store.get_account(&UserId::generate()).unwrap().is_none());
    }

    #[test]
    fn stale_version_conflicts() {
        let (store, _dir) = create_test_store();
        let user_id = seeded(&store, 100);
        let mut account = store.get_account(&user_id).unwrap().unwrap();

        account.balance = 70;
        assert_eq!(store.commit(1, &account, None).unwrap(), 2);
        assert!(matches!(
            store.commit(1, &account, None),
            Err(StoreError::Conflict)
        ));
    }

    #[test]
    fn list_is_newest_first_and_scoped_to_user() {
        let (store, _dir) = create_test_store();
        let user_id: UserId = "user1".parse().unwrap();
        let neighbour: UserId = "user10".parse().unwrap();

        for id in [&user_id, &neighbour] {
            let account = UserAccount::new(id.clone());
            store.create_account_if_absent(&account, None).unwrap();
        }

        let mut version = 1;
        let mut account = store.get_account(&user_id).unwrap().unwrap();
        for i in 1..=3 {
            account.balance += 10;
            let tx = LedgerTransaction::credit(user_id.clone(), 10, account.balance, format!("tx{i}"));
            version = store.commit(version, &account, Some(&tx)).unwrap();
        }
        let other = store.get_account(&neighbour).unwrap().unwrap();
        let tx = LedgerTransaction::credit(neighbour.clone(), 1, 1, "other".into());
        store.commit(1, &other, Some(&tx)).unwrap();

        let listed = store.list_transactions_by_user(&user_id, 10, 0).unwrap();
        let descriptions: Vec<_> = listed.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, ["tx3", "tx2", "tx1"]);

        let page = store.list_transactions_by_user(&user_id, 1, 1).unwrap();
        assert_eq!(page[0].description, "tx2");
    }

    #[test]
    fn plan_limits_roundtrip() {
        let (store, _dir) = create_test_store();
        assert!(store.get_plan_limits().unwrap().is_none());

        let limits = PlanLimits::defaults().with_entry("vip", LimitEntry::default());
        store.put_plan_limits(&limits).unwrap();
        assert_eq!(store.get_plan_limits().unwrap(), Some(limits));
    }

    #[test]
    fn concurrent_deducts_never_overspend() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = seeded(&store, 100);
        let limits = Limits {
            max_daily: 1000,
            cooldown_minutes: 0,
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let user_id = user_id.clone();
                thread::spawn(move || {
                    run_transaction(store.as_ref(), &user_id, 50, |acct| {
                        apply_deduct(acct, &DeductRequest::new(30, "race"), limits, chrono::Utc::now())
                            .map(Some)
                    })
                })
            })
            .collect();

        let results: Vec<std::result::Result<_, LedgerError>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let succeeded = results.iter().filter(|r| r.is_ok()).count();

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(succeeded, 3);
        assert_eq!(account.balance, 10);
        assert_eq!(
            store.list_transactions_by_user(&user_id, 100, 0).unwrap().len(),
            3
        );
    }
}
