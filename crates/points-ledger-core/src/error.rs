//! Error types for the points ledger.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger operations.
///
/// The first five variants are business-rule rejections the caller is
/// expected to branch on. The rest are operational failures.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The referenced account does not exist.
    #[error("user not found: {user_id}")]
    UserNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Balance is below the requested amount.
    #[error("insufficient funds: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance in points.
        balance: i64,
        /// Required amount in points.
        required: i64,
    },

    /// The daily usage ceiling has been reached.
    #[error("daily limit of {max_daily} reached")]
    DailyLimitExceeded {
        /// The configured ceiling for the user.
        max_daily: u32,
    },

    /// The cooldown since the last usage has not yet elapsed.
    #[error("cooldown active: retry in {remaining_minutes} minute(s)")]
    CooldownActive {
        /// Remaining wait time, rounded up to whole minutes.
        remaining_minutes: u32,
    },

    /// The account is disabled and may not spend points.
    #[error("account is disabled: {user_id}")]
    AccountDisabled {
        /// The disabled user.
        user_id: String,
    },

    /// The store kept rejecting the commit because of concurrent writers.
    #[error("transaction aborted after {attempts} conflicting attempts")]
    Contention {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid plan for the requested operation.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Whether this is an expected business-rule rejection rather than a failure.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::InsufficientFunds { .. }
                | Self::DailyLimitExceeded { .. }
                | Self::CooldownActive { .. }
                | Self::AccountDisabled { .. }
        )
    }
}
