//! The ledger engine.
//!
//! `Ledger` is the only writer of balances and usage counters on the user
//! path. Each operation is one [`run_transaction`] against the user's record:
//! the pure transition from `points_ledger_core` runs inside the closure, and
//! the account plus its audit record commit together or not at all.

use std::sync::Arc;

use chrono::Utc;

use points_ledger_core::{
    apply_deduct, apply_refund, resolve_limits, DeductRequest, LedgerError, LedgerTransaction,
    Limits, PlanLimits, RefundRequest, Result, UserAccount, UserId,
};
use points_ledger_store::{run_transaction, Store};

/// Result of a committed deduction.
#[derive(Debug, Clone)]
pub struct DeductOutcome {
    /// Balance after the deduction.
    pub balance: i64,
    /// Today's usage count after the deduction.
    pub daily_usage_count: u32,
    /// The limits the deduction was checked against.
    pub limits: Limits,
    /// The debit record.
    pub transaction: LedgerTransaction,
}

/// Result of a committed refund.
#[derive(Debug, Clone)]
pub struct RefundOutcome {
    /// Balance after the refund.
    pub balance: i64,
    /// Usage count after the refund.
    pub daily_usage_count: u32,
    /// The refund record.
    pub transaction: LedgerTransaction,
}

/// Extra state granted to a newly created account.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bootstrap {
    /// Grant admin rights and the welcome bonus.
    pub admin: bool,
    /// Points credited to a bootstrap admin.
    pub welcome_bonus: i64,
}

/// Point deductions, refunds and balance reads.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
    max_attempts: u32,
}

impl Ledger {
    /// Create a ledger over a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// The global plan limits, or the built-in defaults if they cannot be read.
    #[must_use]
    pub fn plan_limits(&self) -> PlanLimits {
        match self.store.get_plan_limits() {
            Ok(Some(limits)) => limits,
            Ok(None) => PlanLimits::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read plan limits, using defaults");
                PlanLimits::new()
            }
        }
    }

    /// The limits currently governing an account.
    #[must_use]
    pub fn limits_for(&self, account: &UserAccount) -> Limits {
        resolve_limits(account, &self.plan_limits())
    }

    /// Deduct points for a quota-consuming action.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a negative amount, before touching the store.
    /// - `UserNotFound`, `InsufficientFunds`, `DailyLimitExceeded` or
    ///   `CooldownActive` when the action must not proceed.
    /// - `Contention` or a storage error if the commit could not be made.
    pub fn deduct(&self, user_id: &UserId, request: &DeductRequest) -> Result<DeductOutcome> {
        if request.amount < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "amount must not be negative, got {}",
                request.amount
            )));
        }

        let plan_limits = self.plan_limits();
        let mut applied = None;

        let result = run_transaction(self.store.as_ref(), user_id, self.max_attempts, |account| {
            let limits = resolve_limits(account, &plan_limits);
            applied = Some(limits);
            apply_deduct(account, request, limits, Utc::now()).map(Some)
        });

        let committed = match result {
            Ok(committed) => committed,
            Err(e) => {
                if e.is_rejection() {
                    tracing::info!(
                        user_id = %user_id,
                        amount = request.amount,
                        reason = %e,
                        "Deduction rejected"
                    );
                } else {
                    tracing::error!(user_id = %user_id, error = %e, "Deduction failed");
                }
                return Err(e);
            }
        };

        let transaction = committed
            .transaction
            .ok_or_else(|| LedgerError::Storage("deduction committed without a record".into()))?;

        tracing::info!(
            user_id = %user_id,
            amount = request.amount,
            usage_delta = request.usage_delta,
            new_balance = committed.account.balance,
            daily_usage_count = committed.account.daily_usage_count,
            transaction_id = %transaction.id,
            attempts = committed.attempts,
            "Points deducted"
        );

        Ok(DeductOutcome {
            balance: committed.account.balance,
            daily_usage_count: committed.account.daily_usage_count,
            limits: applied.unwrap_or_else(|| resolve_limits(&committed.account, &plan_limits)),
            transaction,
        })
    }

    /// Return points after a failed downstream action.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a negative amount.
    /// - `UserNotFound` if the account does not exist.
    /// - `Contention` or a storage error if the commit could not be made.
    pub fn refund(&self, user_id: &UserId, request: &RefundRequest) -> Result<RefundOutcome> {
        let committed = run_transaction(self.store.as_ref(), user_id, self.max_attempts, |account| {
            apply_refund(account, request, Utc::now()).map(Some)
        })
        .map_err(|e| {
            tracing::warn!(user_id = %user_id, amount = request.amount, error = %e, "Refund failed");
            e
        })?;

        let transaction = committed
            .transaction
            .ok_or_else(|| LedgerError::Storage("refund committed without a record".into()))?;

        tracing::info!(
            user_id = %user_id,
            amount = request.amount,
            new_balance = committed.account.balance,
            transaction_id = %transaction.id,
            "Points refunded"
        );

        Ok(RefundOutcome {
            balance: committed.account.balance,
            daily_usage_count: committed.account.daily_usage_count,
            transaction,
        })
    }

    /// Current balance, or zero when the user has no account.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn get_balance(&self, user_id: &UserId) -> Result<i64> {
        Ok(self
            .store
            .get_account(user_id)?
            .map_or(0, |account| account.balance))
    }

    /// Read an account.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn get_account(&self, user_id: &UserId) -> Result<Option<UserAccount>> {
        Ok(self.store.get_account(user_id)?)
    }

    /// A user's audit trail, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerTransaction>> {
        Ok(self
            .store
            .list_transactions_by_user(user_id, limit, offset)?)
    }

    /// Create the account for a user unless it already exists.
    ///
    /// Returns the stored account and whether it was created by this call.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub fn ensure_account(
        &self,
        user_id: &UserId,
        email: Option<String>,
        bootstrap: Bootstrap,
    ) -> Result<(UserAccount, bool)> {
        let mut account = UserAccount::new(user_id.clone()).with_email(email);
        let mut opening = None;

        if bootstrap.admin {
            account = account.as_bootstrap_admin(bootstrap.welcome_bonus);
            if bootstrap.welcome_bonus != 0 {
                opening = Some(LedgerTransaction::admin_adjustment(
                    user_id.clone(),
                    bootstrap.welcome_bonus,
                    account.balance,
                    "Admin welcome bonus".into(),
                ));
            }
        }

        let (account, created) = self
            .store
            .create_account_if_absent(&account, opening.as_ref())?;

        if created {
            tracing::info!(
                user_id = %user_id,
                is_admin = account.is_admin,
                balance = account.balance,
                "Account created"
            );
        }

        Ok((account, created))
    }
}
