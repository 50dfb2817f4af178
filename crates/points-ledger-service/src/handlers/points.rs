//! Point balance, history, deduction and refund handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use points_ledger_core::{DeductRequest, LedgerTransaction, RefundRequest, UserId};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Upper bound on a page of transactions.
const MAX_PAGE_SIZE: usize = 100;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Balance in points. Zero when the user has no account yet.
    pub balance: i64,
}

/// Get current point balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.get_balance(&auth.user_id)?;
    Ok(Json(BalanceResponse { balance }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Magnitude of the change in points.
    pub amount: i64,
    /// Signed effect on the balance.
    pub signed_amount: i64,
    /// `credit`, `debit` or `refund`.
    pub kind: &'static str,
    /// Balance after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Related order or generation.
    pub related_order_id: Option<String>,
    /// Made through the admin operations.
    pub admin_adjustment: bool,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerTransaction> for TransactionResponse {
    fn from(tx: &LedgerTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            signed_amount: tx.signed_amount(),
            kind: tx.kind.as_str(),
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            related_order_id: tx.related_order_id.clone(),
            admin_adjustment: tx.admin_adjustment,
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// Fetch one page of a user's history.
pub(crate) fn transaction_page(
    state: &AppState,
    user_id: &UserId,
    query: &ListTransactionsQuery,
) -> Result<ListTransactionsResponse, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(MAX_PAGE_SIZE);
    let transactions = state
        .ledger
        .list_transactions(user_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(ListTransactionsResponse {
        transactions,
        has_more,
    })
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    Ok(Json(transaction_page(&state, &auth.user_id, &query)?))
}

/// Deduct request body.
#[derive(Debug, Deserialize)]
pub struct DeductBody {
    /// The user to charge.
    pub user_id: String,
    /// Points to deduct.
    pub amount: i64,
    /// Reason recorded on the debit.
    pub description: String,
    /// Correlation id of the order or generation.
    #[serde(default)]
    pub related_order_id: Option<String>,
    /// Daily quota consumed (default: 1).
    #[serde(default)]
    pub usage_delta: Option<u32>,
}

/// Deduct response.
#[derive(Debug, Serialize)]
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

pub(crate) fn parse_user_id(raw: &str) -> Result<UserId, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid user_id: {e}")))
}

/// Deduct points before a paid action.
pub async fn deduct(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(body): Json<DeductBody>,
) -> Result<Json<DeductResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    // Disabled accounts are checked inside the transaction, against the
    // version that gets committed.
    let mut request = DeductRequest::new(body.amount, body.description).rejecting_disabled();
    request.related_order_id = body.related_order_id;
    if let Some(usage_delta) = body.usage_delta {
        request.usage_delta = usage_delta;
    }

    tracing::debug!(
        user_id = %user_id,
        service = %service.service_name,
        amount = request.amount,
        "Deduct requested"
    );

    let outcome = state.ledger.deduct(&user_id, &request)?;

    Ok(Json(DeductResponse {
        balance: outcome.balance,
        daily_usage_count: outcome.daily_usage_count,
        max_daily: outcome.limits.max_daily,
        cooldown_minutes: outcome.limits.cooldown_minutes,
        transaction_id: outcome.transaction.id.to_string(),
    }))
}

/// Refund request body.
#[derive(Debug, Deserialize)]
pub struct RefundBody {
    /// The user to credit.
    pub user_id: String,
    /// Points to return.
    pub amount: i64,
    /// Reason recorded on the refund.
    pub description: String,
    /// Correlation id of the order or generation.
    #[serde(default)]
    pub related_order_id: Option<String>,
    /// Daily quota to give back (default: 1).
    #[serde(default)]
    pub usage_restore_count: Option<u32>,
}

/// Refund response.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    /// Balance after the refund.
    pub balance: i64,
    /// Usage count after the refund.
    pub daily_usage_count: u32,
    /// ID of the refund record.
    pub transaction_id: String,
}

/// Return points after a failed paid action.
pub async fn refund(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(body): Json<RefundBody>,
) -> Result<Json<RefundResponse>, ApiError> {
    let user_id = parse_user_id(&body.user_id)?;

    let mut request = RefundRequest::new(body.amount, body.description);
    request.related_order_id = body.related_order_id;
    if let Some(count) = body.usage_restore_count {
        request.usage_restore_count = count;
    }

    tracing::debug!(
        user_id = %user_id,
        service = %service.service_name,
        amount = request.amount,
        "Refund requested"
    );

    let outcome = state.ledger.refund(&user_id, &request)?;

    Ok(Json(RefundResponse {
        balance: outcome.balance,
        daily_usage_count: outcome.daily_usage_count,
        transaction_id: outcome.transaction.id.to_string(),
    }))
}
