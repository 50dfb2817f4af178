//! Plan-tier limits and their resolution for a given account.
//!
//! Global limits are stored configuration keyed by plan name; any key or field
//! missing from it falls back to the hardcoded defaults below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::account::UserAccount;

/// Limits key for trial accounts.
pub const TRIAL_KEY: &str = "trial";

/// Limits key paid accounts fall back to.
pub const BASIC_KEY: &str = "basic";

/// The effective limits governing a user's deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum usage deltas per UTC calendar day.
    pub max_daily: u32,

    /// Minimum minutes between quota-consuming deductions. Zero disables it.
    pub cooldown_minutes: u32,
}

/// A stored limits entry. Absent fields fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitEntry {
    /// Maximum usage deltas per day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily: Option<u32>,

    /// Cooldown in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_minutes: Option<u32>,
}

impl From<Limits> for LimitEntry {
    fn from(limits: Limits) -> Self {
        Self {
            max_daily: Some(limits.max_daily),
            cooldown_minutes: Some(limits.cooldown_minutes),
        }
    }
}

/// Global plan limits configuration, keyed by plan name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanLimits(BTreeMap<String, LimitEntry>);

impl PlanLimits {
    /// Create an empty configuration (every lookup uses the defaults).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry for a plan key.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, entry: LimitEntry) -> Self {
        self.0.insert(key.into(), entry);
        self
    }

    /// Get the stored entry for a plan key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&LimitEntry> {
        self.0.get(key)
    }

    /// Whether the key is configured here or has a hardcoded default.
    #[must_use]
    pub fn knows(&self, key: &str) -> bool {
        self.0.contains_key(key) || default_limits(key).is_some()
    }

    /// Iterate over the stored entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &LimitEntry)> {
        self.0.iter()
    }

    /// Resolve a plan key field-by-field against the defaults.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Limits {
        let fallback = default_limits(key).unwrap_or(BASIC_LIMITS);
        let entry = self.get(key).copied().unwrap_or_default();
        Limits {
            max_daily: entry.max_daily.unwrap_or(fallback.max_daily),
            cooldown_minutes: entry.cooldown_minutes.unwrap_or(fallback.cooldown_minutes),
        }
    }

    /// The full default table as stored configuration.
    #[must_use]
    pub fn defaults() -> Self {
        DEFAULT_TABLE
            .iter()
            .fold(Self::new(), |limits, (key, value)| {
                limits.with_entry(*key, LimitEntry::from(*value))
            })
    }
}

const BASIC_LIMITS: Limits = Limits {
    max_daily: 20,
    cooldown_minutes: 30,
};

const DEFAULT_TABLE: [(&str, Limits); 5] = [
    (
        TRIAL_KEY,
        Limits {
            max_daily: 2,
            cooldown_minutes: 0,
        },
    ),
    (BASIC_KEY, BASIC_LIMITS),
    (
        "pro",
        Limits {
            max_daily: 50,
            cooldown_minutes: 10,
        },
    ),
    (
        "elite",
        Limits {
            max_daily: 200,
            cooldown_minutes: 0,
        },
    ),
    (
        "e-commerce",
        Limits {
            max_daily: 100,
            cooldown_minutes: 5,
        },
    ),
];

/// Hardcoded limits for a plan key, if the key is a known tier.
#[must_use]
pub fn default_limits(key: &str) -> Option<Limits> {
    DEFAULT_TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, limits)| *limits)
}

/// Compute the limits that apply to an account.
///
/// In priority order: a custom daily limit (which also removes the cooldown),
/// then the paid plan (falling back to basic when the plan is unset or
/// unknown), then the trial tier. Never fails.
#[must_use]
pub fn resolve_limits(account: &UserAccount, plan_limits: &PlanLimits) -> Limits {
    if let Some(max_daily) = account.custom_daily_limit {
        return Limits {
            max_daily,
            cooldown_minutes: 0,
        };
    }

    let key = if account.is_paid() {
        account
            .plan_type
            .limits_key()
            .filter(|key| plan_limits.knows(key))
            .unwrap_or(BASIC_KEY)
    } else {
        TRIAL_KEY
    };

    plan_limits.lookup(key)
}
