//! Account types for the points ledger.
//!
//! This module defines the per-user record that holds the balance, plan and
//! usage counters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

// ============================================================================
// Constants
// ============================================================================

/// Points granted to the bootstrap admin identity on account creation.
pub const DEFAULT_ADMIN_WELCOME_BONUS: i64 = 1000;

/// Points credited when upgrading to the basic plan.
pub const BASIC_PLAN_POINTS: i64 = 1000;

/// Points credited when upgrading to the pro plan.
pub const PRO_PLAN_POINTS: i64 = 3000;

/// Points credited when upgrading to the elite plan.
pub const ELITE_PLAN_POINTS: i64 = 8000;

/// Points credited when upgrading to the e-commerce plan.
pub const ECOMMERCE_PLAN_POINTS: i64 = 5000;

/// A user's ledger record.
///
/// `daily_usage_count` is only meaningful when `last_reset_date` is today
/// (UTC); a stale count is treated as zero by the usage window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// The user ID (identity provider subject).
    pub id: UserId,

    /// Email reported by the identity provider, if any.
    #[serde(default)]
    pub email: Option<String>,

    /// Current point balance.
    pub balance: i64,

    /// Trial or paid.
    pub account_type: AccountType,

    /// Subscribed plan. Only meaningful for paid accounts.
    pub plan_type: PlanType,

    /// Per-user daily ceiling. Overrides the plan default and disables cooldown.
    #[serde(default)]
    pub custom_daily_limit: Option<u32>,

    /// Usage deltas applied on `last_reset_date`.
    pub daily_usage_count: u32,

    /// Calendar date (UTC) the usage counter belongs to.
    #[serde(default)]
    pub last_reset_date: Option<NaiveDate>,

    /// When the last quota-consuming deduction happened.
    #[serde(default)]
    pub last_usage_time: Option<DateTime<Utc>>,

    /// Disabled accounts are refused point-consuming operations upstream.
    pub is_disabled: bool,

    /// Grants access to the admin operations.
    pub is_admin: bool,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Create a new trial account with zero balance.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: None,
            balance: 0,
            account_type: AccountType::Trial,
            plan_type: PlanType::None,
            custom_daily_limit: None,
            daily_usage_count: 0,
            last_reset_date: None,
            last_usage_time: None,
            is_disabled: false,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the email reported by the identity provider.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Mark the account as the bootstrap admin and grant the welcome bonus.
    #[must_use]
    pub fn as_bootstrap_admin(mut self, welcome_bonus: i64) -> Self {
        self.is_admin = true;
        self.balance = welcome_bonus;
        self
    }

    /// Check if the account has sufficient points for a deduction.
    #[must_use]
    pub fn has_sufficient_points(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Whether the account is on a paid plan.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.account_type == AccountType::Paid
    }
}

/// Trial or paid account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Free trial account.
    Trial,

    /// Account with a paid plan.
    Paid,
}

/// Subscription plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanType {
    /// No plan.
    None,

    /// Basic plan.
    Basic,

    /// Pro plan.
    Pro,

    /// Elite plan.
    Elite,

    /// E-commerce plan.
    #[serde(rename = "e-commerce")]
    ECommerce,
}

impl PlanType {
    /// Key used for this plan in the limits map. `None` has no key.
    #[must_use]
    pub const fn limits_key(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Basic => Some("basic"),
            Self::Pro => Some("pro"),
            Self::Elite => Some("elite"),
            Self::ECommerce => Some("e-commerce"),
        }
    }

    /// Points credited when an account is upgraded to this plan.
    #[must_use]
    pub const fn points_allotment(&self) -> i64 {
        match self {
            Self::Basic => BASIC_PLAN_POINTS,
            Self::Pro => PRO_PLAN_POINTS,
            Self::Elite => ELITE_PLAN_POINTS,
            Self::ECommerce => ECOMMERCE_PLAN_POINTS,
            Self::None => 0,
        }
    }
}
