//! In-memory storage implementation.
//!
//! All state sits behind a single `RwLock`, so a commit's version check and
//! its writes happen under one exclusive guard.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;

use points_ledger_core::{LedgerTransaction, PlanLimits, TransactionId, UserAccount, UserId};

use crate::error::{Result, StoreError};
use crate::{Store, Versioned};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<UserId, Versioned<UserAccount>>,
    transactions: HashMap<TransactionId, LedgerTransaction>,
    transactions_by_user: HashMap<UserId, BTreeSet<TransactionId>>,
    plan_limits: Option<PlanLimits>,
}

impl Inner {
    fn append(&mut self, transaction: &LedgerTransaction) {
        self.transactions_by_user
            .entry(transaction.user_id.clone())
            .or_default()
            .insert(transaction.id);
        self.transactions
            .insert(transaction.id, transaction.clone());
    }
}

/// Process-local storage backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get_versioned(&self, user_id: &UserId) -> Result<Option<Versioned<UserAccount>>> {
        Ok(self.inner.read().accounts.get(user_id).cloned())
    }

    fn create_account_if_absent(
        &self,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<(UserAccount, bool)> {
        let mut inner = self.inner.write();
        if let Some(existing) = inner.accounts.get(&account.id) {
            return Ok((existing.value.clone(), false));
        }

        inner.accounts.insert(
            account.id.clone(),
            Versioned {
                version: 1,
                value: account.clone(),
            },
        );
        if let Some(tx) = transaction {
            inner.append(tx);
        }
        Ok((account.clone(), true))
    }

    fn commit(
        &self,
        expected_version: u64,
        account: &UserAccount,
        transaction: Option<&LedgerTransaction>,
    ) -> Result<u64> {
        let mut inner = self.inner.write();
        let stored = inner
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| StoreError::AccountNotFound {
                user_id: account.id.to_string(),
            })?;

        if stored.version != expected_version {
            return Err(StoreError::Conflict);
        }

        stored.version += 1;
        stored.value = account.clone();
        let version = stored.version;

        if let Some(tx) = transaction {
            inner.append(tx);
        }
        Ok(version)
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<LedgerTransaction>> {
        Ok(self.inner.read().transactions.get(transaction_id).cloned())
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerTransaction>> {
        let inner = self.inner.read();
        let Some(ids) = inner.transactions_by_user.get(user_id) else {
            return Ok(Vec::new());
        };

        Ok(ids
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.transactions.get(id).cloned())
            .collect())
    }

    fn get_plan_limits(&self) -> Result<Option<PlanLimits>> {
        Ok(self.inner.read().plan_limits.clone())
    }

    fn put_plan_limits(&self, limits: &PlanLimits) -> Result<()> {
        self.inner.write().plan_limits = Some(limits.clone());
        Ok(())
    }
}
