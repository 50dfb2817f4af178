//! Usage window and account state transitions.
//!
//! The functions here are the pure halves of the ledger operations: they
//! validate a request against a loaded account, mutate it in place and return
//! the audit record to commit alongside it. Persisting the result atomically is
//! the store's job.
//!
//! The daily counter is reset lazily: a count whose `last_reset_date` is not
//! today (UTC) is read as zero. There is no scheduled reset.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::account::{AccountType, PlanType, UserAccount};
use crate::error::{LedgerError, Result};
use crate::limits::Limits;
use crate::transaction::LedgerTransaction;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// A request to deduct points for a quota-consuming action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductRequest {
    /// Points to deduct.
    pub amount: i64,

    /// Reason recorded on the debit.
    pub description: String,

    /// Correlation id of the order or generation.
    #[serde(default)]
    pub related_order_id: Option<String>,

    /// How much daily quota the action consumes.
    #[serde(default = "default_usage_delta")]
    pub usage_delta: u32,

    /// Refuse the deduction if the account is disabled.
    #[serde(default)]
    pub reject_disabled: bool,
}

const fn default_usage_delta() -> u32 {
    1
}

impl DeductRequest {
    /// Create a request consuming one unit of daily quota.
    #[must_use]
    pub fn new(amount: i64, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
            related_order_id: None,
            usage_delta: default_usage_delta(),
            reject_disabled: false,
        }
    }

    /// Attach the correlation id of the related order.
    #[must_use]
    pub fn with_related_order(mut self, related_order_id: impl Into<String>) -> Self {
        self.related_order_id = Some(related_order_id.into());
        self
    }

    /// Override the quota consumed by the action.
    #[must_use]
    pub fn with_usage_delta(mut self, usage_delta: u32) -> Self {
        self.usage_delta = usage_delta;
        self
    }

    /// Fail with `AccountDisabled` when the account is disabled at commit time.
    #[must_use]
    pub fn rejecting_disabled(mut self) -> Self {
        self.reject_disabled = true;
        self
    }
}

/// A request to return points after a failed downstream action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Points to return.
    pub amount: i64,

    /// Reason recorded on the refund.
    pub description: String,

    /// Correlation id of the order or generation.
    #[serde(default)]
    pub related_order_id: Option<String>,

    /// How much daily quota to give back.
    #[serde(default = "default_usage_delta")]
    pub usage_restore_count: u32,
}

impl RefundRequest {
    /// Create a request restoring one unit of daily quota.
    #[must_use]
    pub fn new(amount: i64, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
            related_order_id: None,
            usage_restore_count: default_usage_delta(),
        }
    }

    /// Attach the correlation id of the related order.
    #[must_use]
    pub fn with_related_order(mut self, related_order_id: impl Into<String>) -> Self {
        self.related_order_id = Some(related_order_id.into());
        self
    }

    /// Override the quota given back.
    #[must_use]
    pub fn with_usage_restore_count(mut self, usage_restore_count: u32) -> Self {
        self.usage_restore_count = usage_restore_count;
        self
    }
}

/// A privileged change that bypasses quota and cooldown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adjustment {
    /// Add a (possibly negative) delta to the balance. Unchecked.
    Balance {
        /// Points to add.
        delta: i64,
        /// Reason recorded on the transaction.
        reason: String,
    },

    /// Move to a paid plan and credit its allotment.
    UpgradePlan {
        /// Target plan.
        plan: PlanType,
        /// Reason recorded on the transaction.
        reason: String,
    },

    /// Return to the trial tier. The balance is kept.
    DowngradeToTrial,

    /// Flip the disabled flag.
    SetDisabled(bool),

    /// Set or clear the per-user daily ceiling.
    SetCustomDailyLimit(Option<u32>),
}

/// The UTC calendar date of `now`.
#[must_use]
pub fn today(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// The usage count for `today`, reading a stale counter as zero.
#[must_use]
pub fn current_daily_count(account: &UserAccount, today: NaiveDate) -> u32 {
    if account.last_reset_date == Some(today) {
        account.daily_usage_count
    } else {
        0
    }
}

/// Whole minutes left before the cooldown expires, or `None` if it has.
///
/// Elapsed time equal to the cooldown counts as expired.
#[must_use]
pub fn cooldown_remaining(
    last_usage_time: DateTime<Utc>,
    cooldown_minutes: u32,
    now: DateTime<Utc>,
) -> Option<u32> {
    let cooldown = Duration::minutes(i64::from(cooldown_minutes));
    let elapsed = now - last_usage_time;
    if elapsed >= cooldown {
        return None;
    }

    let remaining_ms = (cooldown - elapsed).num_milliseconds();
    let minutes = (remaining_ms + MILLIS_PER_MINUTE - 1) / MILLIS_PER_MINUTE;
    // A last-use timestamp in the future never waits longer than the cooldown.
    Some(u32::try_from(minutes).map_or(cooldown_minutes, |m| m.min(cooldown_minutes)))
}

fn ensure_non_negative(amount: i64) -> Result<()> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must not be negative, got {amount}"
        )));
    }
    Ok(())
}

/// The balance after applying `delta`, refusing changes that would overflow.
fn shifted_balance(balance: i64, delta: i64) -> Result<i64> {
    balance.checked_add(delta).ok_or_else(|| {
        LedgerError::InvalidAmount(format!(
            "balance {balance} cannot absorb a change of {delta}"
        ))
    })
}

/// Apply a deduction to a loaded account.
///
/// Checks run in order: disabled flag (when requested), balance, daily quota,
/// cooldown. The account is only modified when every check passes.
///
/// # Errors
///
/// - `InvalidAmount` if the amount is negative.
/// - `AccountDisabled` if the request rejects disabled accounts and this one is.
/// - `InsufficientFunds` if the balance does not cover the amount.
/// - `DailyLimitExceeded` if the usage delta would exceed today's ceiling.
/// - `CooldownActive` if the previous quota-consuming use is too recent.
pub fn apply_deduct(
    account: &mut UserAccount,
    request: &DeductRequest,
    limits: Limits,
    now: DateTime<Utc>,
) -> Result<LedgerTransaction> {
    ensure_non_negative(request.amount)?;

    if request.reject_disabled && account.is_disabled {
        return Err(LedgerError::AccountDisabled {
            user_id: account.id.to_string(),
        });
    }

    if !account.has_sufficient_points(request.amount) {
        return Err(LedgerError::InsufficientFunds {
            balance: account.balance,
            required: request.amount,
        });
    }

    let today = today(now);
    let current = current_daily_count(account, today);
    if current.saturating_add(request.usage_delta) > limits.max_daily {
        return Err(LedgerError::DailyLimitExceeded {
            max_daily: limits.max_daily,
        });
    }

    if request.usage_delta > 0 && limits.cooldown_minutes > 0 {
        if let Some(remaining_minutes) = account
            .last_usage_time
            .and_then(|last| cooldown_remaining(last, limits.cooldown_minutes, now))
        {
            return Err(LedgerError::CooldownActive { remaining_minutes });
        }
    }

    account.balance -= request.amount;
    account.daily_usage_count = current + request.usage_delta;
    account.last_reset_date = Some(today);
    if request.usage_delta > 0 {
        account.last_usage_time = Some(now);
    }
    account.updated_at = now;

    Ok(LedgerTransaction::debit(
        account.id.clone(),
        request.amount,
        account.balance,
        request.description.clone(),
    )
    .with_related_order(request.related_order_id.clone()))
}

/// Apply a refund to a loaded account.
///
/// The usage counter is decremented with a floor at zero; the reset date and
/// last usage time are left alone.
///
/// # Errors
///
/// Returns `InvalidAmount` if the amount is negative or the balance would
/// overflow.
pub fn apply_refund(
    account: &mut UserAccount,
    request: &RefundRequest,
    now: DateTime<Utc>,
) -> Result<LedgerTransaction> {
    ensure_non_negative(request.amount)?;
    let balance = shifted_balance(account.balance, request.amount)?;

    account.balance = balance;
    account.daily_usage_count = account
        .daily_usage_count
        .saturating_sub(request.usage_restore_count);
    account.updated_at = now;

    Ok(LedgerTransaction::refund(
        account.id.clone(),
        request.amount,
        account.balance,
        request.description.clone(),
    )
    .with_related_order(request.related_order_id.clone()))
}

/// Apply a privileged change to a loaded account.
///
/// Returns the audit record for changes that touch the balance, `None` for
/// pure flag or plan changes.
///
/// # Errors
///
/// Returns `InvalidPlan` when upgrading to `PlanType::None`, and
/// `InvalidAmount` for a delta of `i64::MIN` or one that would overflow the
/// balance.
pub fn apply_adjustment(
    account: &mut UserAccount,
    adjustment: &Adjustment,
    now: DateTime<Utc>,
) -> Result<Option<LedgerTransaction>> {
    let transaction = match adjustment {
        Adjustment::Balance { delta, reason } => {
            // The magnitude of i64::MIN is not representable as an amount.
            if *delta == i64::MIN {
                return Err(LedgerError::InvalidAmount(format!(
                    "adjustment of {delta} is out of range"
                )));
            }
            account.balance = shifted_balance(account.balance, *delta)?;
            Some(LedgerTransaction::admin_adjustment(
                account.id.clone(),
                *delta,
                account.balance,
                reason.clone(),
            ))
        }
        Adjustment::UpgradePlan { plan, reason } => {
            if *plan == PlanType::None {
                return Err(LedgerError::InvalidPlan(
                    "cannot upgrade to an empty plan".into(),
                ));
            }
            let allotment = plan.points_allotment();
            let balance = shifted_balance(account.balance, allotment)?;
            account.account_type = AccountType::Paid;
            account.plan_type = *plan;
            account.balance = balance;
            Some(LedgerTransaction {
                admin_adjustment: true,
                ..LedgerTransaction::credit(
                    account.id.clone(),
                    allotment,
                    account.balance,
                    reason.clone(),
                )
            })
        }
        Adjustment::DowngradeToTrial => {
            account.account_type = AccountType::Trial;
            account.plan_type = PlanType::None;
            None
        }
        Adjustment::SetDisabled(disabled) => {
            account.is_disabled = *disabled;
            None
        }
        Adjustment::SetCustomDailyLimit(limit) => {
            account.custom_daily_limit = *limit;
            None
        }
    };

    account.updated_at = now;
    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::{resolve_limits, PlanLimits};
    use crate::transaction::TransactionKind;
    use crate::UserId;

    fn now() -> DateTime<Utc> {
        "2026-03-14T12:00:00Z".parse().unwrap()
    }

    fn trial(balance: i64) -> UserAccount {
        let mut account = UserAccount::new(UserId::generate());
        account.balance = balance;
        account
    }

    fn basic(balance: i64) -> UserAccount {
        let mut account = trial(balance);
        account.account_type = AccountType::Paid;
        account.plan_type = PlanType::Basic;
        account
    }

    fn limits_for(account: &UserAccount) -> Limits {
        resolve_limits(account, &PlanLimits::new())
    }

    #[test]
    fn trial_with_empty_balance_is_insufficient() {
        let mut account = trial(0);
        let limits = limits_for(&account);
        let err = apply_deduct(&mut account, &DeductRequest::new(30, "test"), limits, now())
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                balance: 0,
                required: 30
            }
        ));
        assert_eq!(account.daily_usage_count, 0);
    }

    #[test]
    fn trial_at_daily_limit_is_rejected() {
        let mut account = trial(100);
        account.daily_usage_count = 2;
        account.last_reset_date = Some(today(now()));
        let limits = limits_for(&account);

        let err =
            apply_deduct(&mut account, &DeductRequest::new(10, "x"), limits, now()).unwrap_err();

        assert!(matches!(err, LedgerError::DailyLimitExceeded { max_daily: 2 }));
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn basic_in_cooldown_reports_remaining_minutes() {
        let mut account = basic(100);
        account.last_usage_time = Some(now() - Duration::minutes(5));
        let limits = limits_for(&account);

        let err =
            apply_deduct(&mut account, &DeductRequest::new(10, "x"), limits, now()).unwrap_err();

        assert!(matches!(
            err,
            LedgerError::CooldownActive {
                remaining_minutes: 25
            }
        ));
    }

    #[test]
    fn cooldown_boundary_passes() {
        let mut account = basic(100);
        account.last_usage_time = Some(now() - Duration::minutes(30));
        let limits = limits_for(&account);

        apply_deduct(&mut account, &DeductRequest::new(10, "x"), limits, now()).unwrap();
        assert_eq!(account.balance, 90);
    }

    #[test]
    fn cooldown_rounds_partial_minutes_up() {
        let last = now() - Duration::minutes(29) - Duration::seconds(1);
        assert_eq!(cooldown_remaining(last, 30, now()), Some(1));
        assert_eq!(cooldown_remaining(now(), 30, now()), Some(30));
        assert_eq!(
            cooldown_remaining(now() + Duration::hours(2), 30, now()),
            Some(30)
        );
    }

    #[test]
    fn zero_usage_delta_skips_cooldown_and_keeps_last_usage() {
        let mut account = basic(100);
        let last = now() - Duration::minutes(1);
        account.last_usage_time = Some(last);
        let limits = limits_for(&account);

        let request = DeductRequest::new(5, "storage top-up").with_usage_delta(0);
        apply_deduct(&mut account, &request, limits, now()).unwrap();

        assert_eq!(account.balance, 95);
        assert_eq!(account.last_usage_time, Some(last));
        assert_eq!(account.last_reset_date, Some(today(now())));
    }

    #[test]
    fn stale_counter_rolls_over() {
        let mut account = trial(100);
        account.daily_usage_count = 57;
        account.last_reset_date = Some(today(now()) - Duration::days(1));
        let limits = limits_for(&account);

        apply_deduct(&mut account, &DeductRequest::new(10, "x"), limits, now()).unwrap();

        assert_eq!(account.daily_usage_count, 1);
        assert_eq!(account.last_reset_date, Some(today(now())));
    }

    #[test]
    fn deduct_commits_and_records_debit() {
        let mut account = trial(100);
        let limits = limits_for(&account);
        let request = DeductRequest::new(30, "Ad creative").with_related_order("gen-1");

        let tx = apply_deduct(&mut account, &request, limits, now()).unwrap();

        assert_eq!(account.balance, 70);
        assert_eq!(account.daily_usage_count, 1);
        assert_eq!(account.last_usage_time, Some(now()));
        assert_eq!(tx.kind, TransactionKind::Debit);
        assert_eq!(tx.amount, 30);
        assert_eq!(tx.balance_after, 70);
        assert_eq!(tx.related_order_id.as_deref(), Some("gen-1"));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let mut account = trial(100);
        let limits = limits_for(&account);
        let err =
            apply_deduct(&mut account, &DeductRequest::new(-1, "x"), limits, now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = apply_refund(&mut account, &RefundRequest::new(-1, "x"), now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn refund_restores_deduct() {
        let mut account = trial(100);
        let before = account.clone();
        let limits = limits_for(&account);

        apply_deduct(&mut account, &DeductRequest::new(30, "x"), limits, now()).unwrap();
        let tx = apply_refund(&mut account, &RefundRequest::new(30, "Refund: x Failed"), now())
            .unwrap();

        assert_eq!(account.balance, before.balance);
        assert_eq!(account.daily_usage_count, before.daily_usage_count);
        assert_eq!(tx.kind, TransactionKind::Refund);
        assert_eq!(tx.balance_after, 100);
    }

    #[test]
    fn refund_floors_usage_at_zero() {
        let mut account = trial(0);
        let request = RefundRequest::new(10, "x").with_usage_restore_count(3);
        apply_refund(&mut account, &request, now()).unwrap();

        assert_eq!(account.daily_usage_count, 0);
        assert_eq!(account.balance, 10);
    }

    #[test]
    fn admin_adjustment_may_go_negative() {
        let mut account = trial(30);
        let adjustment = Adjustment::Balance {
            delta: -50,
            reason: "correction".into(),
        };

        let tx = apply_adjustment(&mut account, &adjustment, now())
            .unwrap()
            .unwrap();

        assert_eq!(account.balance, -20);
        assert_eq!(tx.kind, TransactionKind::Debit);
        assert!(tx.admin_adjustment);
    }

    #[test]
    fn upgrade_credits_allotment() {
        let mut account = trial(10);
        let adjustment = Adjustment::UpgradePlan {
            plan: PlanType::Pro,
            reason: "Upgrade to pro".into(),
        };

        let tx = apply_adjustment(&mut account, &adjustment, now())
            .unwrap()
            .unwrap();

        assert_eq!(account.account_type, AccountType::Paid);
        assert_eq!(account.plan_type, PlanType::Pro);
        assert_eq!(account.balance, 3010);
        assert_eq!(tx.kind, TransactionKind::Credit);
        assert_eq!(tx.amount, 3000);
    }

    #[test]
    fn upgrade_to_none_is_rejected() {
        let mut account = trial(10);
        let adjustment = Adjustment::UpgradePlan {
            plan: PlanType::None,
            reason: "noop".into(),
        };
        assert!(matches!(
            apply_adjustment(&mut account, &adjustment, now()),
            Err(LedgerError::InvalidPlan(_))
        ));
        assert_eq!(account.account_type, AccountType::Trial);
    }

    #[test]
    fn downgrade_keeps_balance() {
        let mut account = basic(500);
        let tx = apply_adjustment(&mut account, &Adjustment::DowngradeToTrial, now()).unwrap();

        assert!(tx.is_none());
        assert_eq!(account.account_type, AccountType::Trial);
        assert_eq!(account.plan_type, PlanType::None);
        assert_eq!(account.balance, 500);
    }

    #[test]
    fn flag_changes_record_nothing() {
        let mut account = trial(0);
        assert!(apply_adjustment(&mut account, &Adjustment::SetDisabled(true), now())
            .unwrap()
            .is_none());
        assert!(account.is_disabled);

        apply_adjustment(&mut account, &Adjustment::SetCustomDailyLimit(Some(9)), now()).unwrap();
        assert_eq!(account.custom_daily_limit, Some(9));
        apply_adjustment(&mut account, &Adjustment::SetCustomDailyLimit(None), now()).unwrap();
        assert_eq!(account.custom_daily_limit, None);
    }

    #[test]
    fn disabled_account_rejected_only_when_asked() {
        let mut account = trial(100);
        account.is_disabled = true;
        let limits = limits_for(&account);

        let guarded = DeductRequest::new(10, "x").rejecting_disabled();
        let err = apply_deduct(&mut account, &guarded, limits, now()).unwrap_err();
        assert!(matches!(err, LedgerError::AccountDisabled { .. }));
        assert_eq!(account.balance, 100);
        assert_eq!(account.daily_usage_count, 0);

        apply_deduct(&mut account, &DeductRequest::new(10, "x"), limits, now()).unwrap();
        assert_eq!(account.balance, 90);
    }

    #[test]
    fn adjustment_past_i64_max_is_rejected() {
        let mut account = trial(i64::MAX - 10);
        let adjustment = Adjustment::Balance {
            delta: 100,
            reason: "bonus".into(),
        };

        let err = apply_adjustment(&mut account, &adjustment, now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(account.balance, i64::MAX - 10);
    }

    #[test]
    fn adjustment_of_i64_min_is_rejected() {
        let mut account = trial(0);
        let adjustment = Adjustment::Balance {
            delta: i64::MIN,
            reason: "correction".into(),
        };

        let err = apply_adjustment(&mut account, &adjustment, now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn large_negative_adjustment_records_exact_magnitude() {
        let mut account = trial(0);
        let adjustment = Adjustment::Balance {
            delta: i64::MIN + 1,
            reason: "correction".into(),
        };

        let tx = apply_adjustment(&mut account, &adjustment, now())
            .unwrap()
            .unwrap();
        assert_eq!(account.balance, i64::MIN + 1);
        assert_eq!(tx.signed_amount(), i64::MIN + 1);
        assert_eq!(tx.balance_after, account.balance);
    }

    #[test]
    fn refund_past_i64_max_is_rejected() {
        let mut account = trial(i64::MAX);
        account.daily_usage_count = 1;

        let err = apply_refund(&mut account, &RefundRequest::new(1, "Refund: x Failed"), now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(account.balance, i64::MAX);
        assert_eq!(account.daily_usage_count, 1);
    }

    #[test]
    fn upgrade_that_would_overflow_changes_nothing() {
        let mut account = trial(i64::MAX);
        let adjustment = Adjustment::UpgradePlan {
            plan: PlanType::Pro,
            reason: "upgrade".into(),
        };

        let err = apply_adjustment(&mut account, &adjustment, now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(account.account_type, AccountType::Trial);
        assert_eq!(account.plan_type, PlanType::None);
        assert_eq!(account.balance, i64::MAX);
    }
}
