//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use points_ledger_core::LedgerError;
use points_ledger_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The account is disabled and may not spend points.
    #[error("account is disabled")]
    AccountDisabled,

    /// Insufficient points.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientFunds {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Daily quota reached.
    #[error("daily limit of {max_daily} reached, try again tomorrow")]
    DailyLimitExceeded {
        /// The ceiling that applied.
        max_daily: u32,
    },

    /// Cooldown since the last use has not elapsed.
    #[error("please wait {remaining_minutes} minute(s) before trying again")]
    CooldownActive {
        /// Remaining wait in whole minutes.
        remaining_minutes: u32,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::AccountDisabled => (
                StatusCode::FORBIDDEN,
                "account_disabled",
                self.to_string(),
                None,
            ),
            Self::InsufficientFunds { balance, required } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "balance": balance,
                    "required": required
                })),
            ),
            Self::DailyLimitExceeded { max_daily } => (
                StatusCode::TOO_MANY_REQUESTS,
                "daily_limit_exceeded",
                self.to_string(),
                Some(serde_json::json!({ "max_daily": max_daily })),
            ),
            Self::CooldownActive { remaining_minutes } => (
                StatusCode::TOO_MANY_REQUESTS,
                "cooldown_active",
                self.to_string(),
                Some(serde_json::json!({ "remaining_minutes": remaining_minutes })),
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UserNotFound { user_id } => {
                Self::NotFound(format!("account not found: {user_id}"))
            }
            LedgerError::InsufficientFunds { balance, required } => {
                Self::InsufficientFunds { balance, required }
            }
            LedgerError::DailyLimitExceeded { max_daily } => Self::DailyLimitExceeded { max_daily },
            LedgerError::CooldownActive { remaining_minutes } => {
                Self::CooldownActive { remaining_minutes }
            }
            LedgerError::AccountDisabled { .. } => Self::AccountDisabled,
            LedgerError::InvalidAmount(msg) | LedgerError::InvalidPlan(msg) => {
                Self::BadRequest(msg)
            }
            LedgerError::InvalidId(e) => Self::BadRequest(e.to_string()),
            err @ (LedgerError::Contention { .. }
            | LedgerError::Storage(_)
            | LedgerError::Serialization(_)) => Self::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        LedgerError::from(err).into()
    }
}
