//! Client error types.

/// Errors that can occur when using the points ledger client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Not enough points for the action.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// The user's daily quota is used up.
    #[error("daily limit of {max_daily} reached, try again tomorrow")]
    DailyLimitExceeded {
        /// The ceiling that applied.
        max_daily: u32,
    },

    /// The user must wait before the next action.
    #[error("please wait {remaining_minutes} minute(s) before trying again")]
    CooldownActive {
        /// Remaining wait in whole minutes.
        remaining_minutes: u32,
    },

    /// The account is disabled.
    #[error("account is disabled")]
    AccountDisabled,

    /// Account not found.
    #[error("account not found: {message}")]
    AccountNotFound {
        /// Server message.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Whether the ledger refused the charge on quota grounds.
    ///
    /// These are the rejections a caller should show to the user as-is.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::DailyLimitExceeded { .. }
                | Self::CooldownActive { .. }
                | Self::AccountDisabled
        )
    }
}

/// Failure of a deduct, act, refund sequence.
#[derive(Debug, thiserror::Error)]
pub enum PaidActionError<E> {
    /// The deduction was refused or could not be made. Nothing was charged.
    #[error(transparent)]
    Charge(ClientError),

    /// The action failed after the deduction.
    #[error("paid action failed: {source}")]
    Action {
        /// The action's own error.
        #[source]
        source: E,
        /// The refund error, if the points could not be returned.
        refund_error: Option<ClientError>,
    },
}

impl<E> PaidActionError<E> {
    /// Whether the user ended up charged for a failed action.
    #[must_use]
    pub fn left_charged(&self) -> bool {
        matches!(
            self,
            Self::Action {
                refund_error: Some(_),
                ..
            }
        )
    }
}
