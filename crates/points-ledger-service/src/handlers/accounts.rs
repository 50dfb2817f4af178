//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use points_ledger_core::{current_daily_count, today, AccountType, Limits, PlanType, UserAccount};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Email, if known.
    pub email: Option<String>,
    /// Current balance in points.
    pub balance: i64,
    /// Trial or paid.
    pub account_type: AccountType,
    /// Subscribed plan.
    pub plan_type: PlanType,
    /// Usage count for today (UTC).
    pub daily_usage_count: u32,
    /// Limits currently in force.
    pub limits: Limits,
    /// Per-user daily ceiling, if set.
    pub custom_daily_limit: Option<u32>,
    /// Last quota-consuming deduction.
    pub last_usage_time: Option<String>,
    /// Whether the account may spend points.
    pub is_disabled: bool,
    /// Whether the account has admin rights.
    pub is_admin: bool,
    /// Created timestamp.
    pub created_at: String,
}

impl AccountResponse {
    /// Build the response for an account under the given limits.
    #[must_use]
    pub fn new(account: &UserAccount, limits: Limits) -> Self {
        Self {
            user_id: account.id.to_string(),
            email: account.email.clone(),
            balance: account.balance,
            account_type: account.account_type,
            plan_type: account.plan_type,
            daily_usage_count: current_daily_count(account, today(Utc::now())),
            limits,
            custom_daily_limit: account.custom_daily_limit,
            last_usage_time: account.last_usage_time.map(|t| t.to_rfc3339()),
            is_disabled: account.is_disabled,
            is_admin: account.is_admin,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create account request (optional fields for metadata).
#[derive(Debug, Default, Deserialize)]
pub struct CreateAccountRequest {
    /// Email to record when the token carries none.
    pub email: Option<String>,
}

/// Create the caller's account, or return it if it already exists.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    // Only the token's email can grant the bootstrap admin role.
    let bootstrap = state.bootstrap_for(auth.email.as_deref());
    let email = auth.email.or(body.email);

    let (account, _) = state
        .ledger
        .ensure_account(&auth.user_id, email, bootstrap)?;

    let limits = state.ledger.limits_for(&account);
    Ok(Json(AccountResponse::new(&account, limits)))
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .ledger
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let limits = state.ledger.limits_for(&account);
    Ok(Json(AccountResponse::new(&account, limits)))
}
