//! Privileged account adjustments.
//!
//! These bypass quota and cooldown but go through the same versioned commit as
//! the ledger, so every balance change still lands with its audit record.

use std::sync::Arc;

use chrono::Utc;

use points_ledger_core::{
    apply_adjustment, Adjustment, LedgerError, LedgerTransaction, PlanLimits, PlanType, Result,
    UserAccount, UserId,
};
use points_ledger_store::{run_transaction, Store};

/// Result of an adjustment.
#[derive(Debug, Clone)]
pub struct AdjustOutcome {
    /// The account after the change.
    pub account: UserAccount,
    /// The audit record, for changes that touched the balance.
    pub transaction: Option<LedgerTransaction>,
}

/// Admin operations over accounts and global limits.
#[derive(Clone)]
pub struct AdminFacade {
    store: Arc<dyn Store>,
    max_attempts: u32,
}

impl AdminFacade {
    /// Create a façade over a store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    fn apply(&self, user_id: &UserId, adjustment: &Adjustment) -> Result<AdjustOutcome> {
        let committed = run_transaction(self.store.as_ref(), user_id, self.max_attempts, |account| {
            apply_adjustment(account, adjustment, Utc::now())
        })?;

        Ok(AdjustOutcome {
            account: committed.account,
            transaction: committed.transaction,
        })
    }

    /// Add a signed delta to the balance. The result may be negative.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a storage error.
    pub fn adjust_balance(&self, user_id: &UserId, delta: i64, reason: &str) -> Result<AdjustOutcome> {
        let outcome = self.apply(
            user_id,
            &Adjustment::Balance {
                delta,
                reason: reason.to_string(),
            },
        )?;

        tracing::info!(
            user_id = %user_id,
            delta,
            new_balance = outcome.account.balance,
            reason = %reason,
            "Admin balance adjustment"
        );
        Ok(outcome)
    }

    /// Move an account to a paid plan and credit the plan's allotment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlan` for `PlanType::None`, `UserNotFound` or a storage error.
    pub fn upgrade_to_plan(
        &self,
        user_id: &UserId,
        plan: PlanType,
        reason: &str,
    ) -> Result<AdjustOutcome> {
        if plan == PlanType::None {
            return Err(LedgerError::InvalidPlan(
                "cannot upgrade to an empty plan".into(),
            ));
        }

        let outcome = self.apply(
            user_id,
            &Adjustment::UpgradePlan {
                plan,
                reason: reason.to_string(),
            },
        )?;

        tracing::info!(
            user_id = %user_id,
            plan = ?plan,
            credited = plan.points_allotment(),
            new_balance = outcome.account.balance,
            "Account upgraded"
        );
        Ok(outcome)
    }

    /// Return an account to the trial tier. The balance is kept.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a storage error.
    pub fn downgrade_to_trial(&self, user_id: &UserId) -> Result<AdjustOutcome> {
        let outcome = self.apply(user_id, &Adjustment::DowngradeToTrial)?;
        tracing::info!(user_id = %user_id, "Account downgraded to trial");
        Ok(outcome)
    }

    /// Enable or disable an account.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a storage error.
    pub fn set_disabled(&self, user_id: &UserId, disabled: bool) -> Result<AdjustOutcome> {
        let outcome = self.apply(user_id, &Adjustment::SetDisabled(disabled))?;
        tracing::info!(user_id = %user_id, disabled, "Account disabled flag changed");
        Ok(outcome)
    }

    /// Set or clear the per-user daily ceiling.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` or a storage error.
    pub fn set_custom_daily_limit(
        &self,
        user_id: &UserId,
        limit: Option<u32>,
    ) -> Result<AdjustOutcome> {
        let outcome = self.apply(user_id, &Adjustment::SetCustomDailyLimit(limit))?;
        tracing::info!(user_id = %user_id, limit = ?limit, "Custom daily limit changed");
        Ok(outcome)
    }

    /// The stored global plan limits (empty if never written).
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub fn get_plan_limits(&self) -> Result<PlanLimits> {
        Ok(self.store.get_plan_limits()?.unwrap_or_default())
    }

    /// Replace the global plan limits.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub fn set_plan_limits(&self, limits: &PlanLimits) -> Result<()> {
        self.store.put_plan_limits(limits)?;
        tracing::info!(plans = limits.iter().count(), "Plan limits updated");
        Ok(())
    }
}
