//! Request and response types for the points ledger API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use points_ledger_core::{AccountType, Limits, PlanType, TransactionKind};

// ============================================================================
// Spend
// ============================================================================

/// A paid action to be charged against a user's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidAction {
    /// The user to charge.
    pub user_id: String,
    /// Points the action costs.
    pub amount: i64,
    /// Human-readable reason, reused for the refund on failure.
    pub description: String,
    /// Correlation id of the order or generation.
    pub related_order_id: Option<String>,
    /// Daily quota the action consumes. Defaults to 1 on the server.
    pub usage_delta: Option<u32>,
}

impl PaidAction {
    /// Describe a paid action.
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount: i64, description: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
            description: description.into(),
            related_order_id: None,
            usage_delta: None,
        }
    }

    /// Attach an order or generation id.
    #[must_use]
    pub fn with_related_order(mut self, order_id: impl Into<String>) -> Self {
        self.related_order_id = Some(order_id.into());
        self
    }

    /// Consume a different amount of daily quota.
    #[must_use]
    pub fn with_usage_delta(mut self, usage_delta: u32) -> Self {
        self.usage_delta = Some(usage_delta);
        self
    }

    /// The deduct request for this action.
    #[must_use]
    pub fn deduct_request(&self) -> DeductRequest {
        DeductRequest {
            user_id: self.user_id.clone(),
            amount: self.amount,
            description: self.description.clone(),
            related_order_id: self.related_order_id.clone(),
            usage_delta: self.usage_delta,
        }
    }

    /// The refund request that undoes this action's charge.
    #[must_use]
    pub fn refund_request(&self) -> RefundRequest {
        RefundRequest {
            user_id: self.user_id.clone(),
            amount: self.amount,
            description: format!("Refund: {} Failed", self.description),
            related_order_id: self.related_order_id.clone(),
            usage_restore_count: self.usage_delta,
        }
    }
}

/// Deduct request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductRequest {
    /// The user to charge.
    pub user_id: String,
    /// Points to deduct.
    pub amount: i64,
    /// Reason recorded on the debit.
    pub description: String,
    /// Correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_order_id: Option<String>,
    /// Daily quota consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_delta: Option<u32>,
}

/// Deduct response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductResponse {
    /// Balance after the deduction.
    pub balance: i64,
    /// Today's usage count after the deduction.
    pub daily_usage_count: u32,
    /// Daily ceiling that applied.
    pub max_daily: u32,
    /// Cooldown that applied, in minutes.
    pub cooldown_minutes: u32,
    /// ID of the debit record.
    pub transaction_id: String,
}

/// Refund request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    /// The user to credit.
    pub user_id: String,
    /// Points to return.
    pub amount: i64,
    /// Reason recorded on the refund.
    pub description: String,
    /// Correlation id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_order_id: Option<String>,
    /// Daily quota to give back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_restore_count: Option<u32>,
}

/// Refund response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    /// Balance after the refund.
    pub balance: i64,
    /// Usage count after the refund.
    pub daily_usage_count: u32,
    /// ID of the refund record.
    pub transaction_id: String,
}

// ============================================================================
// Account
// ============================================================================

/// Balance response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Balance in points.
    pub balance: i64,
}

/// Account as returned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// User ID.
    pub user_id: String,
    /// Email, if known.
    pub email: Option<String>,
    /// Current balance.
    pub balance: i64,
    /// Trial or paid.
    pub account_type: AccountType,
    /// Subscribed plan.
    pub plan_type: PlanType,
    /// Usage count for today (UTC).
    pub daily_usage_count: u32,
    /// Limits currently in force.
    pub limits: Limits,
    /// Per-user daily ceiling.
    pub custom_daily_limit: Option<u32>,
    /// Last quota-consuming deduction.
    pub last_usage_time: Option<DateTime<Utc>>,
    /// Whether the account may spend points.
    pub is_disabled: bool,
    /// Whether the account has admin rights.
    pub is_admin: bool,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInfo {
    /// Transaction ID.
    pub id: String,
    /// Magnitude in points.
    pub amount: i64,
    /// Signed effect on the balance.
    pub signed_amount: i64,
    /// Credit, debit or refund.
    pub kind: TransactionKind,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Correlation id.
    pub related_order_id: Option<String>,
    /// Made by an admin.
    pub admin_adjustment: bool,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// Page of audit records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    /// Newest first.
    pub transactions: Vec<TransactionInfo>,
    /// Whether there are more.
    pub has_more: bool,
}

// ============================================================================
// Errors
// ============================================================================

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    pub(crate) fn detail_i64(&self, key: &str) -> Option<i64> {
        self.details.as_ref()?.get(key)?.as_i64()
    }

    pub(crate) fn detail_u32(&self, key: &str) -> Option<u32> {
        u32::try_from(self.details.as_ref()?.get(key)?.as_u64()?).ok()
    }
}
