//! Admin handlers.
//!
//! Every route here requires `AdminAuth`: a valid user token whose account
//! has `is_admin` set.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use points_ledger_core::{PlanLimits, PlanType};

use crate::admin::AdjustOutcome;
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::handlers::accounts::AccountResponse;
use crate::handlers::points::{
    parse_user_id, transaction_page, ListTransactionsQuery, ListTransactionsResponse,
    TransactionResponse,
};
use crate::state::AppState;

/// Account plus the audit record an adjustment produced.
#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    /// The account after the change.
    pub account: AccountResponse,
    /// The audit record, if the balance changed.
    pub transaction: Option<TransactionResponse>,
}

impl AdjustResponse {
    fn new(state: &AppState, outcome: &AdjustOutcome) -> Self {
        Self {
            account: AccountResponse::new(&outcome.account, state.ledger.limits_for(&outcome.account)),
            transaction: outcome.transaction.as_ref().map(TransactionResponse::from),
        }
    }
}

/// Read any account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(user_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let account = state
        .ledger
        .get_account(&user_id)?
        .ok_or_else(|| ApiError::NotFound(format!("account not found: {user_id}")))?;

    let limits = state.ledger.limits_for(&account);
    Ok(Json(AccountResponse::new(&account, limits)))
}

/// Read any account's history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(user_id): Path<String>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    Ok(Json(transaction_page(&state, &user_id, &query)?))
}

/// Balance adjustment request.
#[derive(Debug, Deserialize)]
pub struct AdjustBalanceRequest {
    /// Signed number of points to add.
    pub delta: i64,
    /// Reason recorded on the transaction.
    pub reason: String,
}

/// Add or remove points.
pub async fn adjust_balance(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<String>,
    Json(body): Json<AdjustBalanceRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    tracing::info!(admin_id = %admin.user.user_id, user_id = %user_id, delta = body.delta, "Admin adjusting balance");

    let outcome = state
        .admin
        .adjust_balance(&user_id, body.delta, &body.reason)?;
    Ok(Json(AdjustResponse::new(&state, &outcome)))
}

/// Plan upgrade request.
#[derive(Debug, Deserialize)]
pub struct UpgradePlanRequest {
    /// Target plan.
    pub plan: PlanType,
    /// Reason recorded on the credit. Defaults to "Upgrade to <plan>".
    #[serde(default)]
    pub reason: Option<String>,
}

/// Move an account to a paid plan.
pub async fn upgrade_plan(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<String>,
    Json(body): Json<UpgradePlanRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    let reason = body.reason.unwrap_or_else(|| {
        format!(
            "Upgrade to {}",
            body.plan.limits_key().unwrap_or("none")
        )
    });
    tracing::info!(admin_id = %admin.user.user_id, user_id = %user_id, plan = ?body.plan, "Admin upgrading plan");

    let outcome = state.admin.upgrade_to_plan(&user_id, body.plan, &reason)?;
    Ok(Json(AdjustResponse::new(&state, &outcome)))
}

/// Return an account to the trial tier.
pub async fn downgrade(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<String>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    tracing::info!(admin_id = %admin.user.user_id, user_id = %user_id, "Admin downgrading account");

    let outcome = state.admin.downgrade_to_trial(&user_id)?;
    Ok(Json(AdjustResponse::new(&state, &outcome)))
}

/// Disable flag request.
#[derive(Debug, Deserialize)]
pub struct SetDisabledRequest {
    /// New value of the flag.
    pub disabled: bool,
}

/// Enable or disable an account.
pub async fn set_disabled(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<String>,
    Json(body): Json<SetDisabledRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    tracing::info!(admin_id = %admin.user.user_id, user_id = %user_id, disabled = body.disabled, "Admin changing disabled flag");

    let outcome = state.admin.set_disabled(&user_id, body.disabled)?;
    Ok(Json(AdjustResponse::new(&state, &outcome)))
}

/// Custom daily limit request. `null` clears the override.
#[derive(Debug, Deserialize)]
pub struct SetDailyLimitRequest {
    /// New ceiling, or `None` to fall back to the plan.
    pub limit: Option<u32>,
}

/// Set or clear the per-user daily ceiling.
pub async fn set_daily_limit(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Path(user_id): Path<String>,
    Json(body): Json<SetDailyLimitRequest>,
) -> Result<Json<AdjustResponse>, ApiError> {
    let user_id = parse_user_id(&user_id)?;
    tracing::info!(admin_id = %admin.user.user_id, user_id = %user_id, limit = ?body.limit, "Admin changing daily limit");

    let outcome = state.admin.set_custom_daily_limit(&user_id, body.limit)?;
    Ok(Json(AdjustResponse::new(&state, &outcome)))
}

/// Read the global plan limits.
pub async fn get_plan_limits(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
) -> Result<Json<PlanLimits>, ApiError> {
    Ok(Json(state.admin.get_plan_limits()?))
}

/// Replace the global plan limits.
pub async fn put_plan_limits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(limits): Json<PlanLimits>,
) -> Result<Json<PlanLimits>, ApiError> {
    tracing::info!(admin_id = %admin.user.user_id, "Admin replacing plan limits");
    state.admin.set_plan_limits(&limits)?;
    Ok(Json(limits))
}
